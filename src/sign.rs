//! Digital signature family: Ed25519
//!
//! Private keys are 64 bytes in the NaCl layout, seed followed by public
//! key, so a keypair round-trips through a single private-key buffer.
//! Public keys are 32 bytes and signatures 64. The curve and hashing
//! internals are the `ed25519-dalek` engine; keypair generation draws its
//! seed from a transient PRNG context opened from the options' PRNG
//! options and disposed before returning.
//!
//! `verify` returns `Ok(())` exactly when the signature is valid; every
//! failure mode (malformed key, malformed signature, mismatch) surfaces as
//! [`CryptoError::SignatureVerificationFailed`].

use std::any::Any;
use std::sync::{Arc, Once};

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use zeroize::Zeroize;

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::hash::{self, HASH_ALGORITHM_SHA_512};
use crate::prng::PrngOptions;
use crate::registry::{self, Descriptor, Registration, INTERFACE_SIGNATURE};

/// Selector for Ed25519.
pub const SIGNATURE_ALGORITHM_ED25519: u32 = 0x0000_1000;

const ED25519_SIGNATURE_SIZE: usize = 64;
const ED25519_PRIVATE_KEY_SIZE: usize = 64;
const ED25519_PUBLIC_KEY_SIZE: usize = 32;
const ED25519_SEED_SIZE: usize = 32;

/// A signature algorithm instance behind the family vtable.
pub trait SignatureEngine: Send {
    /// Sign `message` with `private_key` into `signature`.
    fn sign(
        &mut self,
        signature: &mut Buffer,
        private_key: &Buffer,
        message: &[u8],
    ) -> CryptoResult<()>;

    /// Verify `signature` over `message` against `public_key`.
    fn verify(
        &mut self,
        signature: &Buffer,
        public_key: &Buffer,
        message: &[u8],
    ) -> CryptoResult<()>;

    /// Generate a fresh keypair into the caller-owned buffers.
    fn keypair_create(
        &mut self,
        private_key: &mut Buffer,
        public_key: &mut Buffer,
    ) -> CryptoResult<()>;
}

/// Static descriptor for a signature implementation.
pub struct SignatureDescriptor {
    /// Algorithm selector.
    pub algorithm: u32,
    /// The hash the signing construction runs over.
    pub hash_algorithm: u32,
    /// Signature size in bytes.
    pub signature_size: usize,
    /// Private key size in bytes.
    pub private_key_size: usize,
    /// Public key size in bytes.
    pub public_key_size: usize,
    /// Engine constructor invoked by context init.
    pub(crate) new_engine:
        fn(&SignatureOptions) -> CryptoResult<Box<dyn SignatureEngine>>,
    /// Hook run once when the descriptor is cloned into live options.
    pub(crate) options_init:
        Option<fn(&mut SignatureOptions) -> CryptoResult<()>>,
}

/// Live signature options: a descriptor bound to an allocator and a PRNG.
#[derive(Clone)]
pub struct SignatureOptions {
    descriptor: &'static SignatureDescriptor,
    alloc: SharedAllocator,
    prng_options: PrngOptions,
    implementation: Option<Arc<dyn Any + Send + Sync>>,
}

impl SignatureOptions {
    /// Resolve `algorithm` in the registry, binding `alloc` and the PRNG
    /// options used for keypair generation.
    pub fn init(
        alloc: &SharedAllocator,
        prng_options: &PrngOptions,
        algorithm: u32,
    ) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_SIGNATURE, algorithm)
            .ok_or(CryptoError::SignatureOptionsInitMissingImpl)?;
        let Descriptor::Signature(descriptor) = reg.descriptor else {
            return Err(CryptoError::SignatureOptionsInitMissingImpl);
        };

        let mut options = SignatureOptions {
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

    /// Signature size in bytes.
    pub fn signature_size(&self) -> usize {
        self.descriptor.signature_size
    }

    /// Private key size in bytes.
    pub fn private_key_size(&self) -> usize {
        self.descriptor.private_key_size
    }

    /// Public key size in bytes.
    pub fn public_key_size(&self) -> usize {
        self.descriptor.public_key_size
    }

    /// The allocator bound to these options.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// The PRNG options keypair generation draws from.
    pub fn prng_options(&self) -> &PrngOptions {
        &self.prng_options
    }

    /// Begin a signature algorithm instance.
    pub fn create_signature(&self) -> CryptoResult<SignatureContext> {
        let engine = (self.descriptor.new_engine)(self)?;
        Ok(SignatureContext { options: self.clone(), engine })
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

/// A signature algorithm instance.
pub struct SignatureContext {
    options: SignatureOptions,
    engine: Box<dyn SignatureEngine>,
}

impl std::fmt::Debug for SignatureContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureContext").finish_non_exhaustive()
    }
}

impl SignatureContext {
    /// The options this context was created from.
    pub fn options(&self) -> &SignatureOptions {
        &self.options
    }

    /// Sign `message` with `private_key` into the caller-owned
    /// `signature` buffer.
    pub fn sign(
        &mut self,
        signature: &mut Buffer,
        private_key: &Buffer,
        message: &[u8],
    ) -> CryptoResult<()> {
        if signature.size() != self.options.signature_size()
            || private_key.size() != self.options.private_key_size()
        {
            return Err(CryptoError::SignatureInitInvalidArg);
        }
        self.engine.sign(signature, private_key, message)
    }

    /// Verify `signature` over `message` against `public_key`.
    pub fn verify(
        &mut self,
        signature: &Buffer,
        public_key: &Buffer,
        message: &[u8],
    ) -> CryptoResult<()> {
        if signature.size() != self.options.signature_size()
            || public_key.size() != self.options.public_key_size()
        {
            return Err(CryptoError::SignatureInitInvalidArg);
        }
        self.engine.verify(signature, public_key, message)
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
            return Err(CryptoError::SignatureInitInvalidArg);
        }
        self.engine.keypair_create(private_key, public_key)
    }
}

// ---------------------------- Ed25519 engine ---------------------------

struct Ed25519Engine {
    prng_options: PrngOptions,
}

impl SignatureEngine for Ed25519Engine {
    fn sign(
        &mut self,
        signature: &mut Buffer,
        private_key: &Buffer,
        message: &[u8],
    ) -> CryptoResult<()> {
        let mut keypair_bytes = [0u8; ED25519_PRIVATE_KEY_SIZE];
        keypair_bytes.copy_from_slice(private_key.as_slice());
        let signing_key = SigningKey::from_keypair_bytes(&keypair_bytes)
            .map_err(|_| CryptoError::SignatureInitInvalidArg);
        keypair_bytes.zeroize();

        let sig = signing_key?.sign(message);
        signature.as_mut_slice().copy_from_slice(&sig.to_bytes());
        Ok(())
    }

    fn verify(
        &mut self,
        signature: &Buffer,
        public_key: &Buffer,
        message: &[u8],
    ) -> CryptoResult<()> {
        let key_bytes: [u8; ED25519_PUBLIC_KEY_SIZE] = public_key
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::SignatureVerificationFailed)?;
        let verifying_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|_| CryptoError::SignatureVerificationFailed)?;

        let sig_bytes: [u8; ED25519_SIGNATURE_SIZE] = signature
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::SignatureVerificationFailed)?;
        verifying_key
            .verify(message, &Signature::from_bytes(&sig_bytes))
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    fn keypair_create(
        &mut self,
        private_key: &mut Buffer,
        public_key: &mut Buffer,
    ) -> CryptoResult<()> {
        let mut prng = self.prng_options.create_prng()?;
        let mut seed = [0u8; ED25519_SEED_SIZE];
        let read = prng.read_bytes(&mut seed);
        drop(prng);
        read?;

        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = signing_key.verifying_key();

        private_key.as_mut_slice()[..ED25519_SEED_SIZE]
            .copy_from_slice(&seed);
        private_key.as_mut_slice()[ED25519_SEED_SIZE..]
            .copy_from_slice(verifying_key.as_bytes());
        public_key
            .as_mut_slice()
            .copy_from_slice(verifying_key.as_bytes());
        seed.zeroize();
        Ok(())
    }
}

fn new_ed25519_engine(
    options: &SignatureOptions,
) -> CryptoResult<Box<dyn SignatureEngine>> {
    Ok(Box::new(Ed25519Engine {
        prng_options: options.prng_options().clone(),
    }))
}

static ED25519_DESCRIPTOR: SignatureDescriptor = SignatureDescriptor {
    algorithm: SIGNATURE_ALGORITHM_ED25519,
    hash_algorithm: HASH_ALGORITHM_SHA_512,
    signature_size: ED25519_SIGNATURE_SIZE,
    private_key_size: ED25519_PRIVATE_KEY_SIZE,
    public_key_size: ED25519_PUBLIC_KEY_SIZE,
    new_engine: new_ed25519_engine,
    options_init: None,
};

/// Register Ed25519 (and the SHA-512 it depends on). Idempotent.
pub fn register_ed25519() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        hash::register_sha_512();
        registry::register(Registration {
            interface: INTERFACE_SIGNATURE,
            implementation: SIGNATURE_ALGORITHM_ED25519,
            features: SIGNATURE_ALGORITHM_ED25519,
            descriptor: Descriptor::Signature(&ED25519_DESCRIPTOR),
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::system_allocator;
    use crate::prng::{self, PRNG_SOURCE_OPERATING_SYSTEM};

    fn options() -> SignatureOptions {
        register_ed25519();
        prng::register_source_operating_system();
        let alloc = system_allocator();
        let prng_options =
            PrngOptions::init(&alloc, PRNG_SOURCE_OPERATING_SYSTEM).unwrap();
        SignatureOptions::init(
            &alloc,
            &prng_options,
            SIGNATURE_ALGORITHM_ED25519,
        )
        .unwrap()
    }

    // RFC 8032 §7.1 vectors (seed, public key, message, signature):
    // the empty, 1-byte and 2-byte message cases of the reference
    // `sign.input` file.
    const RFC8032_VECTORS: &[(&str, &str, &str, &str)] = &[
        (
            "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
            "",
            "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e06522490155\
             5fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b",
        ),
        (
            "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb",
            "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c",
            "72",
            "92a009a9f0d4cab8720e820b5f642540a2b27b5416503f8fb3762223ebdb69da\
             085ac1e43e15996e458f3613d0f11d8c387b2eaeb4302aeeb00d291612bb0c00",
        ),
        (
            "c5aa8df43f9f837bedb7442f31dcb7b166d38535076f094b85ce3a2e0b4458f7",
            "fc51cd8e6218a1a38da47ed00230f0580816ed13ba3303ac5deb911548908025",
            "af82",
            "6291d657deec24024827e69c3abe01a30ce548a284743a445e3680d7db5ac3ac\
             18ff9b538d16f290ae67f760984dc6594a7c15e9716ed28dc027beceea1ec40a",
        ),
    ];

    #[test]
    fn rfc8032_sign_vectors() {
        let alloc = system_allocator();
        let opts = options();
        let mut ctx = opts.create_signature().unwrap();

        for (seed_hex, public_hex, message_hex, signature_hex) in
            RFC8032_VECTORS
        {
            let seed = hex::decode(seed_hex).unwrap();
            let public = hex::decode(public_hex).unwrap();
            let message = hex::decode(message_hex).unwrap();

            // Private key buffer in the seed || public layout.
            let mut private = Buffer::init(&alloc, 64).unwrap();
            private.as_mut_slice()[..32].copy_from_slice(&seed);
            private.as_mut_slice()[32..].copy_from_slice(&public);
            let public = Buffer::from_slice(&alloc, &public).unwrap();

            let mut signature = Buffer::init(&alloc, 64).unwrap();
            ctx.sign(&mut signature, &private, &message).unwrap();
            assert_eq!(hex::encode(signature.as_slice()), *signature_hex);

            ctx.verify(&signature, &public, &message).unwrap();
        }
    }

    #[test]
    fn generated_keypairs_sign_and_verify() {
        let alloc = system_allocator();
        let opts = options();
        let mut ctx = opts.create_signature().unwrap();

        let mut private = Buffer::init(&alloc, 64).unwrap();
        let mut public = Buffer::init(&alloc, 32).unwrap();
        ctx.keypair_create(&mut private, &mut public).unwrap();

        let message = b"an epoch boundary attestation";
        let mut signature = Buffer::init(&alloc, 64).unwrap();
        ctx.sign(&mut signature, &private, message).unwrap();
        ctx.verify(&signature, &public, message).unwrap();
    }

    #[test]
    fn bit_flips_break_verification() {
        let alloc = system_allocator();
        let opts = options();
        let mut ctx = opts.create_signature().unwrap();

        let mut private = Buffer::init(&alloc, 64).unwrap();
        let mut public = Buffer::init(&alloc, 32).unwrap();
        ctx.keypair_create(&mut private, &mut public).unwrap();

        let message = b"flip one bit anywhere and this dies";
        let mut signature = Buffer::init(&alloc, 64).unwrap();
        ctx.sign(&mut signature, &private, message).unwrap();

        // Flipped signature bit.
        let mut bad_signature = Buffer::init(&alloc, 64).unwrap();
        bad_signature.copy_from(&signature).unwrap();
        bad_signature.as_mut_slice()[17] ^= 0x01;
        assert_eq!(
            ctx.verify(&bad_signature, &public, message).unwrap_err(),
            CryptoError::SignatureVerificationFailed
        );

        // Flipped message bit.
        let mut bad_message = message.to_vec();
        bad_message[3] ^= 0x80;
        assert_eq!(
            ctx.verify(&signature, &public, &bad_message).unwrap_err(),
            CryptoError::SignatureVerificationFailed
        );

        // Flipped public key bit.
        let mut bad_public = Buffer::init(&alloc, 32).unwrap();
        bad_public.copy_from(&public).unwrap();
        bad_public.as_mut_slice()[0] ^= 0x02;
        assert_eq!(
            ctx.verify(&signature, &bad_public, message).unwrap_err(),
            CryptoError::SignatureVerificationFailed
        );
    }

    #[test]
    fn buffer_sizes_are_validated() {
        let alloc = system_allocator();
        let opts = options();
        let mut ctx = opts.create_signature().unwrap();

        let private = Buffer::init(&alloc, 64).unwrap();
        let mut wrong_signature = Buffer::init(&alloc, 63).unwrap();
        assert_eq!(
            ctx.sign(&mut wrong_signature, &private, b"m").unwrap_err(),
            CryptoError::SignatureInitInvalidArg
        );
    }
}
