//! Process-wide abstract factory registry
//!
//! The registry maps `(interface tag, implementation selector)` pairs to
//! algorithm descriptors. It is append-only within a run: `register_*`
//! functions insert descriptors exactly once (each is guarded by a
//! [`std::sync::Once`]) during startup, and options initialization resolves
//! selectors against the table afterwards. Registration happens-before any
//! lookup that observes it; first write wins and later inserts for the same
//! key are ignored.
//!
//! The descriptor payload is a typed sum over the families rather than an
//! opaque pointer, so a lookup under the wrong interface tag can never be
//! misinterpreted; each family's options init rejects a descriptor of the
//! wrong variant as a missing implementation.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::agreement::KeyAgreementDescriptor;
use crate::block::BlockDescriptor;
use crate::hash::HashDescriptor;
use crate::kdf::KeyDerivationDescriptor;
use crate::mac::MacDescriptor;
use crate::prng::PrngDescriptor;
use crate::sign::SignatureDescriptor;
use crate::stream::StreamDescriptor;
use crate::suite::SuiteDescriptor;

/// Interface tag for the hash family.
pub const INTERFACE_HASH: u32 = 0x0100;
/// Interface tag for the digital signature family.
pub const INTERFACE_SIGNATURE: u32 = 0x0200;
/// Interface tag for the PRNG family.
pub const INTERFACE_PRNG: u32 = 0x0300;
/// Interface tag for the MAC family.
pub const INTERFACE_MAC: u32 = 0x0400;
/// Interface tag for the key agreement family.
pub const INTERFACE_KEY_AGREEMENT: u32 = 0x0500;
/// Interface tag for the block cipher family.
pub const INTERFACE_BLOCK_CIPHER: u32 = 0x0600;
/// Interface tag for the stream cipher family.
pub const INTERFACE_STREAM_CIPHER: u32 = 0x0700;
/// Interface tag for the key derivation family.
pub const INTERFACE_KEY_DERIVATION: u32 = 0x0800;
/// Interface tag for crypto suites.
pub const INTERFACE_SUITE: u32 = 0x0900;

/// Typed descriptor payload, one variant per family.
#[derive(Clone, Copy)]
pub enum Descriptor {
    /// A hash algorithm descriptor.
    Hash(&'static HashDescriptor),
    /// A digital signature algorithm descriptor.
    Signature(&'static SignatureDescriptor),
    /// A PRNG source descriptor.
    Prng(&'static PrngDescriptor),
    /// A MAC algorithm descriptor.
    Mac(&'static MacDescriptor),
    /// A key agreement algorithm descriptor.
    KeyAgreement(&'static KeyAgreementDescriptor),
    /// A block cipher algorithm descriptor.
    BlockCipher(&'static BlockDescriptor),
    /// A stream cipher algorithm descriptor.
    StreamCipher(&'static StreamDescriptor),
    /// A key derivation algorithm descriptor.
    KeyDerivation(&'static KeyDerivationDescriptor),
    /// A crypto suite descriptor.
    Suite(&'static SuiteDescriptor),
}

/// One registry entry.
#[derive(Clone, Copy)]
pub struct Registration {
    /// The family this implementation belongs to.
    pub interface: u32,
    /// The algorithm selector.
    pub implementation: u32,
    /// Feature bits advertised by the implementation (selector bits today).
    pub features: u32,
    /// The algorithm descriptor consumed by options init.
    pub descriptor: Descriptor,
}

fn table() -> &'static RwLock<HashMap<(u32, u32), Registration>> {
    static TABLE: OnceLock<RwLock<HashMap<(u32, u32), Registration>>> =
        OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Append a registration. A key already present is left untouched.
pub fn register(entry: Registration) {
    let mut map = table().write().expect("registry lock poisoned");
    let key = (entry.interface, entry.implementation);
    if map.contains_key(&key) {
        return;
    }
    tracing::debug!(
        interface = %format_args!("{:#06x}", entry.interface),
        implementation = %format_args!("{:#010x}", entry.implementation),
        "registered crypto implementation"
    );
    map.insert(key, entry);
}

/// Look up a registration, returning `None` on a miss.
pub fn find(interface: u32, implementation: u32) -> Option<Registration> {
    let map = table().read().expect("registry lock poisoned");
    map.get(&(interface, implementation)).copied()
}
