//! MAC family and the generic HMAC construction
//!
//! The registered algorithms are HMAC (RFC 2104) instantiated over each
//! SHA-2 family member. The construction is generic: it drives any hash
//! registered in this crate through its public options/context surface, so
//! a new hash gets a working HMAC for free.
//!
//! Keying rules, given hash block size `B` and output size `L`:
//! a key longer than `B` is first hashed (to `L` bytes); the key is then
//! zero-extended to `B` bytes; the inner hash is seeded with `key ⊕ 0x36^B`
//! and the outer hash with `key ⊕ 0x5C^B`.

use std::any::Any;
use std::sync::{Arc, Once};

use zeroize::Zeroize;

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::hash::{
    self, HashContext, HashOptions, HASH_ALGORITHM_SHA_256,
    HASH_ALGORITHM_SHA_384, HASH_ALGORITHM_SHA_512,
    HASH_ALGORITHM_SHA_512_224, HASH_ALGORITHM_SHA_512_256,
};
use crate::registry::{self, Descriptor, Registration, INTERFACE_MAC};

/// Selector for HMAC-SHA-256.
pub const MAC_ALGORITHM_SHA_256_HMAC: u32 = 0x0000_0100;
/// Selector for HMAC-SHA-384.
pub const MAC_ALGORITHM_SHA_384_HMAC: u32 = 0x0000_0200;
/// Selector for HMAC-SHA-512.
pub const MAC_ALGORITHM_SHA_512_HMAC: u32 = 0x0000_0400;
/// Selector for HMAC-SHA-512/224.
pub const MAC_ALGORITHM_SHA_512_224_HMAC: u32 = 0x0000_0800;
/// Selector for HMAC-SHA-512/256.
pub const MAC_ALGORITHM_SHA_512_256_HMAC: u32 = 0x0000_1000;

/// Per-operation MAC state behind the family vtable.
pub trait MacEngine: Send {
    /// Absorb `data` into the authentication code.
    fn digest(&mut self, data: &[u8]) -> CryptoResult<()>;

    /// Complete the code into `out` (already validated to `mac_size`).
    fn finalize(self: Box<Self>, out: &mut Buffer) -> CryptoResult<()>;
}

/// Static algorithm descriptor for a MAC implementation.
pub struct MacDescriptor {
    /// Algorithm selector.
    pub algorithm: u32,
    /// Native key size in bytes.
    pub key_size: usize,
    /// Authentication code size in bytes.
    pub mac_size: usize,
    /// Whether keys of other sizes are accepted and expanded/compressed.
    pub key_expansion_supported: bool,
    /// Largest message the algorithm accepts.
    pub maximum_message_size: usize,
    /// The hash the construction runs over (informational for HMAC).
    pub hash_algorithm: u32,
    /// Engine constructor invoked by context init with the caller's key.
    pub(crate) new_engine:
        fn(&MacOptions, &Buffer) -> CryptoResult<Box<dyn MacEngine>>,
    /// Hook run once when the descriptor is cloned into live options.
    pub(crate) options_init:
        Option<fn(&mut MacOptions) -> CryptoResult<()>>,
}

/// Live MAC options: a descriptor bound to an allocator.
#[derive(Clone)]
pub struct MacOptions {
    descriptor: &'static MacDescriptor,
    alloc: SharedAllocator,
    implementation: Option<Arc<dyn Any + Send + Sync>>,
}

impl MacOptions {
    /// Resolve `algorithm` in the registry and bind it to `alloc`.
    pub fn init(
        alloc: &SharedAllocator,
        algorithm: u32,
    ) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_MAC, algorithm)
            .ok_or(CryptoError::MacOptionsInitMissingImpl)?;
        let Descriptor::Mac(descriptor) = reg.descriptor else {
            return Err(CryptoError::MacOptionsInitMissingImpl);
        };

        let mut options = MacOptions {
            descriptor,
            alloc: Arc::clone(alloc),
            implementation: None,
        };
        if let Some(hook) = descriptor.options_init {
            hook(&mut options)?;
        }
        Ok(options)
    }

    /// The algorithm selector these options were resolved from.
    pub fn algorithm(&self) -> u32 {
        self.descriptor.algorithm
    }

    /// Native key size in bytes.
    pub fn key_size(&self) -> usize {
        self.descriptor.key_size
    }

    /// Authentication code size in bytes.
    pub fn mac_size(&self) -> usize {
        self.descriptor.mac_size
    }

    /// The allocator bound to these options.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// Allocate a buffer sized for this algorithm's authentication code.
    pub fn code_buffer(&self) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.descriptor.mac_size)
    }

    /// Begin a keyed MAC operation.
    pub fn create_mac(&self, key: &Buffer) -> CryptoResult<MacContext> {
        if key.is_empty() {
            return Err(CryptoError::MacInitInvalidArg);
        }
        if !self.descriptor.key_expansion_supported
            && key.size() != self.descriptor.key_size
        {
            return Err(CryptoError::MacInitInvalidKey);
        }
        let engine = (self.descriptor.new_engine)(self, key)?;
        Ok(MacContext { options: self.clone(), engine })
    }

    pub(crate) fn implementation(
        &self,
    ) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.implementation.as_ref()
    }

    pub(crate) fn set_implementation(
        &mut self,
        state: Arc<dyn Any + Send + Sync>,
    ) {
        self.implementation = Some(state);
    }
}

/// A single in-flight keyed MAC operation.
pub struct MacContext {
    options: MacOptions,
    engine: Box<dyn MacEngine>,
}

impl std::fmt::Debug for MacContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacContext").finish_non_exhaustive()
    }
}

impl MacContext {
    /// The options this context was created from.
    pub fn options(&self) -> &MacOptions {
        &self.options
    }

    /// Absorb `data` into the authentication code.
    pub fn digest(&mut self, data: &[u8]) -> CryptoResult<()> {
        self.engine.digest(data)
    }

    /// Complete the code, consuming the context. `out` must be exactly
    /// `mac_size` bytes.
    pub fn finalize(self, out: &mut Buffer) -> CryptoResult<()> {
        if out.size() != self.options.mac_size() {
            return Err(CryptoError::MacFinalizeInvalidArg);
        }
        self.engine.finalize(out)
    }
}

// ------------------------- HMAC construction --------------------------

/// Generic HMAC state over a pluggable hash.
pub(crate) struct HmacState {
    hash: HashContext,
    key: Buffer,
    hash_options: HashOptions,
}

impl HmacState {
    /// Key an HMAC over `hash_options` with `key`, pre-seeding the inner
    /// hash.
    pub(crate) fn init(
        hash_options: &HashOptions,
        key: &Buffer,
    ) -> CryptoResult<Self> {
        let alloc = hash_options.allocator().clone();
        let block_size = hash_options.block_size();

        // Normalize the key to exactly one hash block.
        let mut key_block = Buffer::init(&alloc, block_size)?;
        if key.size() > block_size {
            let mut key_hash = hash_options.create_hash()?;
            key_hash.digest(key.as_slice())?;
            let mut digest = hash_options.digest_buffer()?;
            key_hash.finalize(&mut digest)?;
            key_block.as_mut_slice()[..digest.size()]
                .copy_from_slice(digest.as_slice());
        } else {
            key_block.as_mut_slice()[..key.size()]
                .copy_from_slice(key.as_slice());
        }

        // Seed the inner hash with key ⊕ 0x36.
        let mut hash = hash_options.create_hash()?;
        let mut inner_key: Vec<u8> =
            key_block.as_slice().iter().map(|&b| b ^ 0x36).collect();
        let result = hash.digest(&inner_key);
        inner_key.zeroize();
        result?;

        Ok(HmacState {
            hash,
            key: key_block,
            hash_options: hash_options.clone(),
        })
    }

    fn finalize_into(self, out: &mut Buffer) -> CryptoResult<()> {
        let HmacState { hash, key, hash_options } = self;

        // Complete the inner hash.
        let mut inner = hash_options.digest_buffer()?;
        hash.finalize(&mut inner)?;

        // Outer pass: H(key ⊕ 0x5C || inner).
        let mut outer_hash = hash_options.create_hash()?;
        let mut outer_key: Vec<u8> =
            key.as_slice().iter().map(|&b| b ^ 0x5C).collect();
        let result = outer_hash.digest(&outer_key);
        outer_key.zeroize();
        result?;
        outer_hash.digest(inner.as_slice())?;
        outer_hash.finalize(out)
    }
}

impl MacEngine for HmacState {
    fn digest(&mut self, data: &[u8]) -> CryptoResult<()> {
        self.hash.digest(data)
    }

    fn finalize(self: Box<Self>, out: &mut Buffer) -> CryptoResult<()> {
        (*self).finalize_into(out)
    }
}

macro_rules! hmac_impl {
    ($register:ident, $descriptor:ident, $ctor:ident, $selector:expr,
     $hash_selector:expr, $hash_register:path, $key_size:expr,
     $mac_size:expr) => {
        fn $ctor(
            options: &MacOptions,
            key: &Buffer,
        ) -> CryptoResult<Box<dyn MacEngine>> {
            let hash_options =
                HashOptions::init(options.allocator(), $hash_selector)?;
            Ok(Box::new(HmacState::init(&hash_options, key)?))
        }

        static $descriptor: MacDescriptor = MacDescriptor {
            algorithm: $selector,
            key_size: $key_size,
            mac_size: $mac_size,
            key_expansion_supported: true,
            maximum_message_size: usize::MAX,
            hash_algorithm: $hash_selector,
            new_engine: $ctor,
            options_init: None,
        };

        /// Register this HMAC algorithm (and its hash). Idempotent.
        pub fn $register() {
            static REGISTERED: Once = Once::new();
            REGISTERED.call_once(|| {
                $hash_register();
                registry::register(Registration {
                    interface: INTERFACE_MAC,
                    implementation: $selector,
                    features: $selector,
                    descriptor: Descriptor::Mac(&$descriptor),
                });
            });
        }
    };
}

hmac_impl!(
    register_sha_256_hmac, SHA_256_HMAC_DESCRIPTOR, new_sha_256_hmac,
    MAC_ALGORITHM_SHA_256_HMAC, HASH_ALGORITHM_SHA_256,
    hash::register_sha_256, 32, 32
);
hmac_impl!(
    register_sha_384_hmac, SHA_384_HMAC_DESCRIPTOR, new_sha_384_hmac,
    MAC_ALGORITHM_SHA_384_HMAC, HASH_ALGORITHM_SHA_384,
    hash::register_sha_384, 48, 48
);
hmac_impl!(
    register_sha_512_hmac, SHA_512_HMAC_DESCRIPTOR, new_sha_512_hmac,
    MAC_ALGORITHM_SHA_512_HMAC, HASH_ALGORITHM_SHA_512,
    hash::register_sha_512, 64, 64
);
hmac_impl!(
    register_sha_512_224_hmac, SHA_512_224_HMAC_DESCRIPTOR,
    new_sha_512_224_hmac, MAC_ALGORITHM_SHA_512_224_HMAC,
    HASH_ALGORITHM_SHA_512_224, hash::register_sha_512_224, 28, 28
);
hmac_impl!(
    register_sha_512_256_hmac, SHA_512_256_HMAC_DESCRIPTOR,
    new_sha_512_256_hmac, MAC_ALGORITHM_SHA_512_256_HMAC,
    HASH_ALGORITHM_SHA_512_256, hash::register_sha_512_256, 32, 32
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::system_allocator;
    use hmac::{Hmac as RefHmac, Mac as _};

    fn options_for(algorithm: u32) -> MacOptions {
        register_sha_256_hmac();
        register_sha_384_hmac();
        register_sha_512_hmac();
        register_sha_512_224_hmac();
        register_sha_512_256_hmac();
        MacOptions::init(&system_allocator(), algorithm).unwrap()
    }

    fn mac_hex(algorithm: u32, key: &[u8], message: &[u8]) -> String {
        let options = options_for(algorithm);
        let key =
            Buffer::from_slice(&system_allocator(), key).unwrap();
        let mut ctx = options.create_mac(&key).unwrap();
        ctx.digest(message).unwrap();
        let mut code = options.code_buffer().unwrap();
        ctx.finalize(&mut code).unwrap();
        hex::encode(code.as_slice())
    }

    // RFC 4231 test cases 1, 2, 3, 4, 6 and 7 for HMAC-SHA-512.
    #[test]
    fn rfc4231_case_1() {
        assert_eq!(
            mac_hex(
                MAC_ALGORITHM_SHA_512_HMAC,
                &[0x0b; 20],
                b"Hi There"
            ),
            "87aa7cdea5ef619d4ff0b4241a1d6cb02379f4e2ce4ec2787ad0b30545e17cde\
             daa833b7d6b8a702038b274eaea3f4e4be9d914eeb61f1702e696c203a126854"
        );
    }

    #[test]
    fn rfc4231_case_2() {
        assert_eq!(
            mac_hex(
                MAC_ALGORITHM_SHA_512_HMAC,
                b"Jefe",
                b"what do ya want for nothing?"
            ),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn rfc4231_case_3() {
        assert_eq!(
            mac_hex(
                MAC_ALGORITHM_SHA_512_HMAC,
                &[0xaa; 20],
                &[0xdd; 50]
            ),
            "fa73b0089d56a284efb0f0756c890be9b1b5dbdd8ee81a3655f83e33b2279d39\
             bf3e848279a722c806b485a47e67c807b946a337bee8942674278859e13292fb"
        );
    }

    #[test]
    fn rfc4231_case_4() {
        let key: Vec<u8> = (0x01..=0x19).collect();
        assert_eq!(
            mac_hex(MAC_ALGORITHM_SHA_512_HMAC, &key, &[0xcd; 50]),
            "b0ba465637458c6990e5a8c5f61d4af7e576d97ff94b872de76f8050361ee3db\
             a91ca5c11aa25eb4d679275cc5788063a5f19741120c4f2de2adebeb10a298dd"
        );
    }

    #[test]
    fn rfc4231_case_6_oversized_key() {
        assert_eq!(
            mac_hex(
                MAC_ALGORITHM_SHA_512_HMAC,
                &[0xaa; 131],
                b"Test Using Larger Than Block-Size Key - Hash Key First"
            ),
            "80b24263c7c1a3ebb71493c1dd7be8b49b46d1f41b4aeec1121b013783f8f352\
             6b56d037e05f2598bd0fd2215d6a1e5295e64f73f63f0aec8b915a985d786598"
        );
    }

    #[test]
    fn rfc4231_case_7_oversized_key_and_data() {
        assert_eq!(
            mac_hex(
                MAC_ALGORITHM_SHA_512_HMAC,
                &[0xaa; 131],
                b"This is a test using a larger than block-size key and a \
                  larger than block-size data. The key needs to be hashed \
                  before being used by the HMAC algorithm."
                    .as_slice()
            ),
            "e37b6a775dc87dbaa4dfa9f96e5e3ffddebd71f8867289865df5a32d20cdc944\
             b6022cac3c4982b10d5eeb55c3e4de15134676fb6de0446065c97440fa8c6a58"
        );
    }

    #[test]
    fn matches_reference_hmac_for_every_variant() {
        let key = [0x42u8; 17];
        let message = b"generic construction cross-check";

        macro_rules! check {
            ($selector:expr, $hash:ty) => {
                let mut reference =
                    RefHmac::<$hash>::new_from_slice(&key).unwrap();
                reference.update(message);
                let expected =
                    hex::encode(reference.finalize().into_bytes());
                assert_eq!(mac_hex($selector, &key, message), expected);
            };
        }

        check!(MAC_ALGORITHM_SHA_256_HMAC, sha2::Sha256);
        check!(MAC_ALGORITHM_SHA_384_HMAC, sha2::Sha384);
        check!(MAC_ALGORITHM_SHA_512_HMAC, sha2::Sha512);
        check!(MAC_ALGORITHM_SHA_512_224_HMAC, sha2::Sha512_224);
        check!(MAC_ALGORITHM_SHA_512_256_HMAC, sha2::Sha512_256);
    }

    #[test]
    fn empty_key_is_rejected() {
        let options = options_for(MAC_ALGORITHM_SHA_512_HMAC);
        let key = Buffer::init(&system_allocator(), 0).unwrap();
        assert_eq!(
            options.create_mac(&key).unwrap_err(),
            CryptoError::MacInitInvalidArg
        );
    }

    #[test]
    fn init_failure_rolls_back_cleanly() {
        register_sha_512_hmac();
        // The HMAC key block is the first allocation; failing it must
        // surface out-of-memory with no partially built context.
        let failing = crate::alloc::testing::FailingAllocator::after(1);
        let key = Buffer::from_slice(&failing, &[7u8; 16]).unwrap();
        let options =
            MacOptions::init(&failing, MAC_ALGORITHM_SHA_512_HMAC).unwrap();
        assert_eq!(
            options.create_mac(&key).unwrap_err(),
            CryptoError::BufferInitOutOfMemory
        );
    }

    #[test]
    fn finalize_rejects_wrong_size_buffer() {
        let options = options_for(MAC_ALGORITHM_SHA_512_256_HMAC);
        let key =
            Buffer::from_slice(&system_allocator(), &[7u8; 32]).unwrap();
        let mut ctx = options.create_mac(&key).unwrap();
        ctx.digest(b"x").unwrap();
        let mut wrong = Buffer::init(&system_allocator(), 64).unwrap();
        assert_eq!(
            ctx.finalize(&mut wrong).unwrap_err(),
            CryptoError::MacFinalizeInvalidArg
        );
    }
}
