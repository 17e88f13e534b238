//! Key agreement family: X25519 with hashed long-term variants
//!
//! Three registered algorithms share the X25519 exchange and differ in how
//! the raw point is post-processed into the long-term secret:
//!
//! | selector | long-term secret | size |
//! |---|---|---|
//! | plain | `X25519(priv, pub)` | 32 |
//! | SHA-512 | `SHA512(X25519(priv, pub))` | 64 |
//! | SHA-512/256 | `SHA512/256(X25519(priv, pub))` | 32 |
//!
//! The short-term secret extracts a per-session key from the long-term
//! secret with the variant's HMAC, keyed by the long-term secret and fed
//! `server_nonce || client_nonce` in that order. Both peers must agree
//! which of them is the "server" and pass that peer's nonce first; the
//! ordering is what makes the derivation symmetric. The plain variant
//! defines no short-term operation.

use std::any::Any;
use std::sync::{Arc, Once};

use zeroize::Zeroize;

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::hash::{
    HashOptions, HASH_ALGORITHM_SHA_512, HASH_ALGORITHM_SHA_512_256,
};
use crate::mac::{
    MacOptions, MAC_ALGORITHM_SHA_512_256_HMAC, MAC_ALGORITHM_SHA_512_HMAC,
};
use crate::prng::PrngOptions;
use crate::registry::{
    self, Descriptor, Registration, INTERFACE_KEY_AGREEMENT,
};
use crate::{hash, mac};

/// Selector for plain X25519 key agreement.
pub const KEY_AGREEMENT_ALGORITHM_CURVE25519_PLAIN: u32 = 0x0001_0000;
/// Selector for X25519 with a SHA-512 wrapped long-term secret.
pub const KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512: u32 = 0x0002_0000;
/// Selector for X25519 with a SHA-512/256 wrapped long-term secret.
pub const KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512_256: u32 = 0x0004_0000;

const X25519_KEY_SIZE: usize = 32;

/// A key agreement algorithm instance behind the family vtable.
pub trait KeyAgreementEngine: Send {
    /// Derive the long-term secret from static keys.
    fn long_term_secret_create(
        &mut self,
        private_key: &Buffer,
        public_key: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()>;

    /// Derive the short-term secret from static keys plus peer nonces.
    fn short_term_secret_create(
        &mut self,
        private_key: &Buffer,
        public_key: &Buffer,
        server_nonce: &Buffer,
        client_nonce: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()>;

    /// Generate a fresh keypair into the caller-owned buffers.
    fn keypair_create(
        &mut self,
        private_key: &mut Buffer,
        public_key: &mut Buffer,
    ) -> CryptoResult<()>;
}

/// Static descriptor for a key agreement implementation.
pub struct KeyAgreementDescriptor {
    /// Algorithm selector.
    pub algorithm: u32,
    /// The hash wrapping the long-term secret (0 when unwrapped).
    pub hash_algorithm: u32,
    /// The HMAC used for short-term extraction.
    pub hmac_algorithm: u32,
    /// Shared secret size in bytes.
    pub shared_secret_size: usize,
    /// Private key size in bytes.
    pub private_key_size: usize,
    /// Public key size in bytes.
    pub public_key_size: usize,
    /// Smallest nonce accepted by short-term extraction.
    pub minimum_nonce_size: usize,
    /// Whether the algorithm defines a short-term operation.
    pub short_term_supported: bool,
    /// Engine constructor invoked by context init.
    pub(crate) new_engine:
        fn(&KeyAgreementOptions) -> CryptoResult<Box<dyn KeyAgreementEngine>>,
    /// Hook run once when the descriptor is cloned into live options.
    pub(crate) options_init:
        Option<fn(&mut KeyAgreementOptions) -> CryptoResult<()>>,
}

/// Live key agreement options: a descriptor bound to an allocator and a
/// PRNG.
#[derive(Clone)]
pub struct KeyAgreementOptions {
    descriptor: &'static KeyAgreementDescriptor,
    alloc: SharedAllocator,
    prng_options: PrngOptions,
    implementation: Option<Arc<dyn Any + Send + Sync>>,
}

impl KeyAgreementOptions {
    /// Resolve `algorithm` in the registry, binding `alloc` and the PRNG
    /// options used for keypair generation.
    pub fn init(
        alloc: &SharedAllocator,
        prng_options: &PrngOptions,
        algorithm: u32,
    ) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_KEY_AGREEMENT, algorithm)
            .ok_or(CryptoError::KeyAgreementOptionsInitMissingImpl)?;
        let Descriptor::KeyAgreement(descriptor) = reg.descriptor else {
            return Err(CryptoError::KeyAgreementOptionsInitMissingImpl);
        };

        let mut options = KeyAgreementOptions {
            descriptor,
            alloc: Arc::clone(alloc),
            prng_options: prng_options.clone(),
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

    /// Shared secret size in bytes.
    pub fn shared_secret_size(&self) -> usize {
        self.descriptor.shared_secret_size
    }

    /// Private key size in bytes.
    pub fn private_key_size(&self) -> usize {
        self.descriptor.private_key_size
    }

    /// Public key size in bytes.
    pub fn public_key_size(&self) -> usize {
        self.descriptor.public_key_size
    }

    /// Smallest nonce accepted by short-term extraction.
    pub fn minimum_nonce_size(&self) -> usize {
        self.descriptor.minimum_nonce_size
    }

    /// The allocator bound to these options.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// The PRNG options keypair generation draws from.
    pub fn prng_options(&self) -> &PrngOptions {
        &self.prng_options
    }

    /// Begin a key agreement algorithm instance.
    pub fn create_key_agreement(&self) -> CryptoResult<KeyAgreementContext> {
        let engine = (self.descriptor.new_engine)(self)?;
        Ok(KeyAgreementContext { options: self.clone(), engine })
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

/// A key agreement algorithm instance.
pub struct KeyAgreementContext {
    options: KeyAgreementOptions,
    engine: Box<dyn KeyAgreementEngine>,
}

impl KeyAgreementContext {
    /// The options this context was created from.
    pub fn options(&self) -> &KeyAgreementOptions {
        &self.options
    }

    /// Derive the long-term secret for `(private_key, public_key)` into
    /// the caller-owned `shared` buffer.
    pub fn long_term_secret_create(
        &mut self,
        private_key: &Buffer,
        public_key: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()> {
        if private_key.size() != self.options.private_key_size()
            || public_key.size() != self.options.public_key_size()
            || shared.size() != self.options.shared_secret_size()
        {
            return Err(CryptoError::KeyAgreementInitInvalidArg);
        }
        self.engine.long_term_secret_create(private_key, public_key, shared)
    }

    /// Derive the short-term secret for this session. Both peers must
    /// pass the designated server peer's nonce as `server_nonce`. The
    /// nonces must never be reused for this keypair.
    pub fn short_term_secret_create(
        &mut self,
        private_key: &Buffer,
        public_key: &Buffer,
        server_nonce: &Buffer,
        client_nonce: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()> {
        let opts = &self.options;
        if !opts.descriptor.short_term_supported
            || private_key.size() != opts.private_key_size()
            || public_key.size() != opts.public_key_size()
            || server_nonce.size() < opts.minimum_nonce_size()
            || client_nonce.size() < opts.minimum_nonce_size()
            || shared.size() != opts.shared_secret_size()
        {
            return Err(CryptoError::KeyAgreementShortTermCreateInvalidArg);
        }
        self.engine.short_term_secret_create(
            private_key,
            public_key,
            server_nonce,
            client_nonce,
            shared,
        )
    }

    /// Generate a fresh keypair into the caller-owned buffers.
    pub fn keypair_create(
        &mut self,
        private_key: &mut Buffer,
        public_key: &mut Buffer,
    ) -> CryptoResult<()> {
        if private_key.size() != self.options.private_key_size()
            || public_key.size() != self.options.public_key_size()
        {
            return Err(CryptoError::KeyAgreementInitInvalidArg);
        }
        self.engine.keypair_create(private_key, public_key)
    }
}

// ---------------------------- X25519 engine ----------------------------

/// Shared X25519 engine; variants differ in the long-term wrap hash.
struct X25519Engine {
    options: KeyAgreementOptions,
    /// Hash selector wrapping the long-term secret; `None` is plain.
    wrap_hash: Option<u32>,
}

impl X25519Engine {
    /// `X25519(priv, pub)`, optionally wrapped by the variant hash.
    fn raw_long_term(
        &self,
        private_key: &Buffer,
        public_key: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()> {
        let private: [u8; X25519_KEY_SIZE] = private_key
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::KeyAgreementInitInvalidArg)?;
        let public: [u8; X25519_KEY_SIZE] = public_key
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::KeyAgreementInitInvalidArg)?;
        let mut point = x25519_dalek::x25519(private, public);

        let result = match self.wrap_hash {
            None => {
                shared.as_mut_slice().copy_from_slice(&point);
                Ok(())
            }
            Some(algorithm) => {
                let hash_options = HashOptions::init(
                    self.options.allocator(),
                    algorithm,
                )?;
                let mut hash = hash_options.create_hash()?;
                hash.digest(&point)
                    .and_then(|_| hash.finalize(shared))
            }
        };
        point.zeroize();
        result
    }
}

impl KeyAgreementEngine for X25519Engine {
    fn long_term_secret_create(
        &mut self,
        private_key: &Buffer,
        public_key: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()> {
        self.raw_long_term(private_key, public_key, shared)
    }

    fn short_term_secret_create(
        &mut self,
        private_key: &Buffer,
        public_key: &Buffer,
        server_nonce: &Buffer,
        client_nonce: &Buffer,
        shared: &mut Buffer,
    ) -> CryptoResult<()> {
        // Extract with the variant HMAC, keyed by the long-term secret.
        let mut long_term = Buffer::init(
            self.options.allocator(),
            self.options.shared_secret_size(),
        )?;
        self.raw_long_term(private_key, public_key, &mut long_term)?;

        let mac_options = MacOptions::init(
            self.options.allocator(),
            self.options.descriptor.hmac_algorithm,
        )?;
        let mut mac = mac_options.create_mac(&long_term)?;
        mac.digest(server_nonce.as_slice())?;
        mac.digest(client_nonce.as_slice())?;
        mac.finalize(shared)
    }

    fn keypair_create(
        &mut self,
        private_key: &mut Buffer,
        public_key: &mut Buffer,
    ) -> CryptoResult<()> {
        let mut prng = self.options.prng_options().create_prng()?;
        let mut secret = [0u8; X25519_KEY_SIZE];
        let read = prng.read_bytes(&mut secret);
        drop(prng);
        read?;

        let public = x25519_dalek::x25519(
            secret,
            x25519_dalek::X25519_BASEPOINT_BYTES,
        );
        private_key.as_mut_slice().copy_from_slice(&secret);
        public_key.as_mut_slice().copy_from_slice(&public);
        secret.zeroize();
        Ok(())
    }
}

macro_rules! x25519_impl {
    ($register:ident, $descriptor:ident, $ctor:ident, $selector:expr,
     $hash_alg:expr, $wrap:expr, $hmac_alg:expr, $deps:expr,
     $secret_size:expr, $nonce_size:expr, $short_term:expr) => {
        fn $ctor(
            options: &KeyAgreementOptions,
        ) -> CryptoResult<Box<dyn KeyAgreementEngine>> {
            Ok(Box::new(X25519Engine {
                options: options.clone(),
                wrap_hash: $wrap,
            }))
        }

        static $descriptor: KeyAgreementDescriptor = KeyAgreementDescriptor {
            algorithm: $selector,
            hash_algorithm: $hash_alg,
            hmac_algorithm: $hmac_alg,
            shared_secret_size: $secret_size,
            private_key_size: X25519_KEY_SIZE,
            public_key_size: X25519_KEY_SIZE,
            minimum_nonce_size: $nonce_size,
            short_term_supported: $short_term,
            new_engine: $ctor,
            options_init: None,
        };

        /// Register this X25519 variant (and its dependencies).
        /// Idempotent.
        pub fn $register() {
            static REGISTERED: Once = Once::new();
            REGISTERED.call_once(|| {
                ($deps)();
                registry::register(Registration {
                    interface: INTERFACE_KEY_AGREEMENT,
                    implementation: $selector,
                    features: $selector,
                    descriptor: Descriptor::KeyAgreement(&$descriptor),
                });
            });
        }
    };
}

x25519_impl!(
    register_curve25519_plain, CURVE25519_PLAIN_DESCRIPTOR,
    new_curve25519_plain, KEY_AGREEMENT_ALGORITHM_CURVE25519_PLAIN,
    0, None, 0, || {}, 32, 32, false
);
x25519_impl!(
    register_curve25519_sha512, CURVE25519_SHA512_DESCRIPTOR,
    new_curve25519_sha512, KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512,
    HASH_ALGORITHM_SHA_512, Some(HASH_ALGORITHM_SHA_512),
    MAC_ALGORITHM_SHA_512_HMAC,
    || {
        hash::register_sha_512();
        mac::register_sha_512_hmac();
    },
    64, 64, true
);
x25519_impl!(
    register_curve25519_sha512_256, CURVE25519_SHA512_256_DESCRIPTOR,
    new_curve25519_sha512_256,
    KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512_256,
    HASH_ALGORITHM_SHA_512_256, Some(HASH_ALGORITHM_SHA_512_256),
    MAC_ALGORITHM_SHA_512_256_HMAC,
    || {
        hash::register_sha_512_256();
        mac::register_sha_512_256_hmac();
    },
    32, 32, true
);
