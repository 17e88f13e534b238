//! Hash family: options, contexts and the SHA-2 registrations
//!
//! The lifecycle is the template every other family follows:
//!
//! 1. a `register_*` function publishes a `'static` [`HashDescriptor`] in
//!    the registry (once, guarded);
//! 2. [`HashOptions::init`] resolves a selector into live options bound to
//!    an allocator, running the descriptor's `options_init` hook;
//! 3. [`HashOptions::create_hash`] yields a [`HashContext`] whose state
//!    machine is `digest*` then `finalize`.
//!
//! Contexts are strictly linear: `finalize` consumes the context, so reuse
//! after finalize is unrepresentable. The digest buffer handed to
//! `finalize` must be exactly `hash_size` bytes.
//!
//! The compression functions themselves are external collaborators
//! (the `sha2` crate); this module owns the composition machinery only.

use std::any::Any;
use std::sync::{Arc, Once};

use sha2::digest::DynDigest;
use sha2::{Sha256, Sha384, Sha512, Sha512_224, Sha512_256};

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::registry::{self, Descriptor, Registration, INTERFACE_HASH};

/// Selector for SHA-256.
pub const HASH_ALGORITHM_SHA_256: u32 = 0x0000_0100;
/// Selector for SHA-384.
pub const HASH_ALGORITHM_SHA_384: u32 = 0x0000_0200;
/// Selector for SHA-512.
pub const HASH_ALGORITHM_SHA_512: u32 = 0x0000_0400;
/// Selector for SHA-512/224.
pub const HASH_ALGORITHM_SHA_512_224: u32 = 0x0000_0800;
/// Selector for SHA-512/256.
pub const HASH_ALGORITHM_SHA_512_256: u32 = 0x0000_1000;

/// Per-operation hash state behind the family vtable.
pub trait HashEngine: Send {
    /// Absorb `data` into the running digest.
    fn digest(&mut self, data: &[u8]) -> CryptoResult<()>;

    /// Complete the digest into `out` (already validated to `hash_size`).
    fn finalize(self: Box<Self>, out: &mut Buffer) -> CryptoResult<()>;
}

/// Static algorithm descriptor for a hash implementation.
pub struct HashDescriptor {
    /// Algorithm selector.
    pub algorithm: u32,
    /// Digest size in bytes.
    pub hash_size: usize,
    /// Input block size in bytes.
    pub block_size: usize,
    /// Engine constructor invoked by context init.
    pub(crate) new_engine:
        fn(&HashOptions) -> CryptoResult<Box<dyn HashEngine>>,
    /// Hook run once when the descriptor is cloned into live options.
    pub(crate) options_init:
        Option<fn(&mut HashOptions) -> CryptoResult<()>>,
}

/// Live hash options: a descriptor bound to an allocator.
#[derive(Clone)]
pub struct HashOptions {
    descriptor: &'static HashDescriptor,
    alloc: SharedAllocator,
    implementation: Option<Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for HashOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashOptions").finish_non_exhaustive()
    }
}

impl HashOptions {
    /// Resolve `algorithm` in the registry and bind it to `alloc`.
    pub fn init(
        alloc: &SharedAllocator,
        algorithm: u32,
    ) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_HASH, algorithm)
            .ok_or(CryptoError::HashOptionsInitMissingImpl)?;
        let Descriptor::Hash(descriptor) = reg.descriptor else {
            return Err(CryptoError::HashOptionsInitMissingImpl);
        };

        let mut options = HashOptions {
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

    /// Digest size in bytes.
    pub fn hash_size(&self) -> usize {
        self.descriptor.hash_size
    }

    /// Input block size in bytes.
    pub fn block_size(&self) -> usize {
        self.descriptor.block_size
    }

    /// The allocator bound to these options.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// Allocate a buffer sized for this algorithm's digest.
    pub fn digest_buffer(&self) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.descriptor.hash_size)
    }

    /// Begin a hash operation.
    pub fn create_hash(&self) -> CryptoResult<HashContext> {
        let engine = (self.descriptor.new_engine)(self)?;
        Ok(HashContext { options: self.clone(), engine })
    }

    /// Implementation state installed by an `options_init` hook.
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

/// A single in-flight hash operation.
pub struct HashContext {
    options: HashOptions,
    engine: Box<dyn HashEngine>,
}

impl std::fmt::Debug for HashContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashContext").finish_non_exhaustive()
    }
}

impl HashContext {
    /// The options this context was created from.
    pub fn options(&self) -> &HashOptions {
        &self.options
    }

    /// Absorb `data` into the digest.
    pub fn digest(&mut self, data: &[u8]) -> CryptoResult<()> {
        self.engine.digest(data)
    }

    /// Complete the digest, consuming the context. `out` must be exactly
    /// `hash_size` bytes.
    pub fn finalize(self, out: &mut Buffer) -> CryptoResult<()> {
        if out.size() != self.options.hash_size() {
            return Err(CryptoError::HashFinalizeInvalidArg);
        }
        self.engine.finalize(out)
    }
}

// --------------------------- SHA-2 engines ----------------------------

/// Adapter from a `sha2` digest state to the family vtable.
struct Sha2Engine {
    state: Box<dyn DynDigest + Send>,
}

impl HashEngine for Sha2Engine {
    fn digest(&mut self, data: &[u8]) -> CryptoResult<()> {
        self.state.update(data);
        Ok(())
    }

    fn finalize(self: Box<Self>, out: &mut Buffer) -> CryptoResult<()> {
        let digest = self.state.finalize();
        let slice = out.as_mut_slice();
        if digest.len() != slice.len() {
            return Err(CryptoError::HashFinalizeInvalidArg);
        }
        slice.copy_from_slice(&digest);
        Ok(())
    }
}

macro_rules! sha2_impl {
    ($register:ident, $descriptor:ident, $ctor:ident, $engine_ty:ty,
     $selector:expr, $hash_size:expr, $block_size:expr) => {
        fn $ctor(_options: &HashOptions) -> CryptoResult<Box<dyn HashEngine>> {
            Ok(Box::new(Sha2Engine {
                state: Box::new(<$engine_ty>::default()),
            }))
        }

        static $descriptor: HashDescriptor = HashDescriptor {
            algorithm: $selector,
            hash_size: $hash_size,
            block_size: $block_size,
            new_engine: $ctor,
            options_init: None,
        };

        /// Register this hash algorithm. Idempotent.
        pub fn $register() {
            static REGISTERED: Once = Once::new();
            REGISTERED.call_once(|| {
                registry::register(Registration {
                    interface: INTERFACE_HASH,
                    implementation: $selector,
                    features: $selector,
                    descriptor: Descriptor::Hash(&$descriptor),
                });
            });
        }
    };
}

sha2_impl!(
    register_sha_256, SHA_256_DESCRIPTOR, new_sha_256, Sha256,
    HASH_ALGORITHM_SHA_256, 32, 64
);
sha2_impl!(
    register_sha_384, SHA_384_DESCRIPTOR, new_sha_384, Sha384,
    HASH_ALGORITHM_SHA_384, 48, 128
);
sha2_impl!(
    register_sha_512, SHA_512_DESCRIPTOR, new_sha_512, Sha512,
    HASH_ALGORITHM_SHA_512, 64, 128
);
sha2_impl!(
    register_sha_512_224, SHA_512_224_DESCRIPTOR, new_sha_512_224,
    Sha512_224, HASH_ALGORITHM_SHA_512_224, 28, 128
);
sha2_impl!(
    register_sha_512_256, SHA_512_256_DESCRIPTOR, new_sha_512_256,
    Sha512_256, HASH_ALGORITHM_SHA_512_256, 32, 128
);
