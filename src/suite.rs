//! Crypto suite composition
//!
//! A suite pins one concrete algorithm per family behind a single named
//! selector, so application code asks the suite for "the hash" or "the
//! signature scheme" and never touches family options directly. Suite
//! options own one live options object per selected family, built in a
//! fixed order (hash, PRNG, signature, MAC, short MAC, key agreement for
//! auth, key agreement for ciphers, key derivation, block cipher, stream
//! cipher); a failure partway through unwinds the already-built options in
//! reverse. The suite also exposes typed buffer constructors for every
//! size the pinned algorithms traffic in.
//!
//! The Velo V1 suite selects SHA-512, the OS CPRNG, Ed25519,
//! HMAC-SHA-512, X25519-SHA-512 for authentication, X25519-SHA-512/256
//! for cipher keying, AES-256-2X-CBC and AES-256-2X-CTR. It pins no short
//! MAC and no key derivation algorithm; asking for either fails with the
//! family's missing-implementation status.

use std::sync::Once;

use crate::agreement::{
    self, KeyAgreementContext, KeyAgreementOptions,
    KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512,
    KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512_256,
};
use crate::alloc::SharedAllocator;
use crate::block::{
    self, BlockContext, BlockOptions, BLOCK_ALGORITHM_AES_256_2X_CBC,
};
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::hash::{self, HashContext, HashOptions, HASH_ALGORITHM_SHA_512};
use crate::kdf::{KeyDerivationContext, KeyDerivationOptions};
use crate::mac::{self, MacContext, MacOptions, MAC_ALGORITHM_SHA_512_HMAC};
use crate::prng::{
    self, PrngContext, PrngOptions, PRNG_SOURCE_OPERATING_SYSTEM, UUID_SIZE,
};
use crate::registry::{self, Descriptor, Registration, INTERFACE_SUITE};
use crate::sign::{
    self, SignatureContext, SignatureOptions, SIGNATURE_ALGORITHM_ED25519,
};
use crate::stream::{
    self, StreamContext, StreamOptions, STREAM_ALGORITHM_AES_256_2X_CTR,
};

/// Selector for the Velo V1 crypto suite.
pub const SUITE_VELO_V1: u32 = 0x0000_0001;

/// Static descriptor for a crypto suite: the per-family selectors plus
/// the per-family init thunks run against suite-owned options.
pub struct SuiteDescriptor {
    /// Suite selector.
    pub suite_id: u32,
    /// Hash algorithm selector.
    pub hash_alg: u32,
    /// Digital signature algorithm selector.
    pub sign_alg: u32,
    /// PRNG source selector.
    pub prng_src: u32,
    /// MAC algorithm selector.
    pub mac_alg: u32,
    /// Short MAC algorithm selector, when the suite pins one.
    pub mac_short_alg: Option<u32>,
    /// Key agreement selector for authentication.
    pub key_auth_alg: u32,
    /// Key agreement selector for cipher keying.
    pub key_cipher_alg: u32,
    /// Key derivation selector, when the suite pins one.
    pub key_derivation_alg: Option<u32>,
    /// HMAC selector used as the key derivation PRF.
    pub key_derivation_hmac_alg: u32,
    /// Block cipher algorithm selector.
    pub block_cipher_alg: u32,
    /// Stream cipher algorithm selector.
    pub stream_cipher_alg: u32,

    pub(crate) hash_init: fn(&SuiteOptions) -> CryptoResult<HashContext>,
    pub(crate) sign_init:
        fn(&SuiteOptions) -> CryptoResult<SignatureContext>,
    pub(crate) prng_init: fn(&SuiteOptions) -> CryptoResult<PrngContext>,
    pub(crate) mac_init:
        fn(&SuiteOptions, &Buffer) -> CryptoResult<MacContext>,
    pub(crate) mac_short_init:
        fn(&SuiteOptions, &Buffer) -> CryptoResult<MacContext>,
    pub(crate) key_auth_init:
        fn(&SuiteOptions) -> CryptoResult<KeyAgreementContext>,
    pub(crate) key_cipher_init:
        fn(&SuiteOptions) -> CryptoResult<KeyAgreementContext>,
    pub(crate) key_derivation_init:
        fn(&SuiteOptions) -> CryptoResult<KeyDerivationContext>,
    pub(crate) block_init:
        fn(&SuiteOptions, &Buffer, bool) -> CryptoResult<BlockContext>,
    pub(crate) stream_init:
        fn(&SuiteOptions, &Buffer) -> CryptoResult<StreamContext>,
}

/// Live suite options owning one options object per selected family.
pub struct SuiteOptions {
    descriptor: &'static SuiteDescriptor,
    alloc: SharedAllocator,
    // Fields are declared in reverse construction order so drop unwinds
    // the newest sub-options first.
    stream_opts: StreamOptions,
    block_opts: BlockOptions,
    key_derivation_opts: Option<KeyDerivationOptions>,
    key_cipher_opts: KeyAgreementOptions,
    key_auth_opts: KeyAgreementOptions,
    mac_short_opts: Option<MacOptions>,
    mac_opts: MacOptions,
    sign_opts: SignatureOptions,
    prng_opts: PrngOptions,
    hash_opts: HashOptions,
}

impl std::fmt::Debug for SuiteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteOptions").finish_non_exhaustive()
    }
}

impl SuiteOptions {
    /// Resolve `suite_id` in the registry and build every family's
    /// options against `alloc`, in the fixed suite order.
    pub fn init(
        alloc: &SharedAllocator,
        suite_id: u32,
    ) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_SUITE, suite_id)
            .ok_or(CryptoError::SuiteOptionsInitMissingImpl)?;
        let Descriptor::Suite(descriptor) = reg.descriptor else {
            return Err(CryptoError::SuiteOptionsInitMissingImpl);
        };
        tracing::debug!(
            suite = %format_args!("{suite_id:#010x}"),
            "initializing crypto suite options"
        );

        // Construction order is fixed; an error unwinds the locals built
        // so far in reverse.
        let hash_opts = HashOptions::init(alloc, descriptor.hash_alg)?;
        let prng_opts = PrngOptions::init(alloc, descriptor.prng_src)?;
        let sign_opts = SignatureOptions::init(
            alloc,
            &prng_opts,
            descriptor.sign_alg,
        )?;
        let mac_opts = MacOptions::init(alloc, descriptor.mac_alg)?;
        let mac_short_opts = match descriptor.mac_short_alg {
            Some(selector) => Some(MacOptions::init(alloc, selector)?),
            None => None,
        };
        let key_auth_opts = KeyAgreementOptions::init(
            alloc,
            &prng_opts,
            descriptor.key_auth_alg,
        )?;
        let key_cipher_opts = KeyAgreementOptions::init(
            alloc,
            &prng_opts,
            descriptor.key_cipher_alg,
        )?;
        let key_derivation_opts = match descriptor.key_derivation_alg {
            Some(selector) => Some(KeyDerivationOptions::init(
                alloc,
                selector,
                descriptor.key_derivation_hmac_alg,
            )?),
            None => None,
        };
        let block_opts =
            BlockOptions::init(alloc, descriptor.block_cipher_alg)?;
        let stream_opts =
            StreamOptions::init(alloc, descriptor.stream_cipher_alg)?;

        Ok(SuiteOptions {
            descriptor,
            alloc: std::sync::Arc::clone(alloc),
            stream_opts,
            block_opts,
            key_derivation_opts,
            key_cipher_opts,
            key_auth_opts,
            mac_short_opts,
            mac_opts,
            sign_opts,
            prng_opts,
            hash_opts,
        })
    }

    /// The suite selector these options were resolved from.
    pub fn suite_id(&self) -> u32 {
        self.descriptor.suite_id
    }

    /// The suite descriptor.
    pub fn descriptor(&self) -> &'static SuiteDescriptor {
        self.descriptor
    }

    /// The allocator bound to this suite.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    // ----------------------- family options access ----------------------

    /// The suite-owned hash options.
    pub fn hash_options(&self) -> &HashOptions {
        &self.hash_opts
    }

    /// The suite-owned PRNG options.
    pub fn prng_options(&self) -> &PrngOptions {
        &self.prng_opts
    }

    /// The suite-owned signature options.
    pub fn sign_options(&self) -> &SignatureOptions {
        &self.sign_opts
    }

    /// The suite-owned MAC options.
    pub fn mac_options(&self) -> &MacOptions {
        &self.mac_opts
    }

    /// The suite-owned short MAC options, when pinned.
    pub fn mac_short_options(&self) -> Option<&MacOptions> {
        self.mac_short_opts.as_ref()
    }

    /// The suite-owned auth key agreement options.
    pub fn key_auth_options(&self) -> &KeyAgreementOptions {
        &self.key_auth_opts
    }

    /// The suite-owned cipher key agreement options.
    pub fn key_cipher_options(&self) -> &KeyAgreementOptions {
        &self.key_cipher_opts
    }

    /// The suite-owned key derivation options, when pinned.
    pub fn key_derivation_options(&self) -> Option<&KeyDerivationOptions> {
        self.key_derivation_opts.as_ref()
    }

    /// The suite-owned block cipher options.
    pub fn block_options(&self) -> &BlockOptions {
        &self.block_opts
    }

    /// The suite-owned stream cipher options.
    pub fn stream_options(&self) -> &StreamOptions {
        &self.stream_opts
    }

    // -------------------------- family factories ------------------------

    /// Begin a hash operation with the suite's hash algorithm.
    pub fn hash_init(&self) -> CryptoResult<HashContext> {
        (self.descriptor.hash_init)(self)
    }

    /// Open the suite's PRNG source.
    pub fn prng_init(&self) -> CryptoResult<PrngContext> {
        (self.descriptor.prng_init)(self)
    }

    /// Begin a signature instance with the suite's signature algorithm.
    pub fn digital_signature_init(&self) -> CryptoResult<SignatureContext> {
        (self.descriptor.sign_init)(self)
    }

    /// Begin a keyed MAC with the suite's MAC algorithm.
    pub fn mac_init(&self, key: &Buffer) -> CryptoResult<MacContext> {
        (self.descriptor.mac_init)(self, key)
    }

    /// Begin a keyed MAC with the suite's short MAC algorithm.
    pub fn mac_short_init(&self, key: &Buffer) -> CryptoResult<MacContext> {
        (self.descriptor.mac_short_init)(self, key)
    }

    /// Begin a key agreement instance for authentication.
    pub fn auth_key_agreement_init(
        &self,
    ) -> CryptoResult<KeyAgreementContext> {
        (self.descriptor.key_auth_init)(self)
    }

    /// Begin a key agreement instance for cipher keying.
    pub fn cipher_key_agreement_init(
        &self,
    ) -> CryptoResult<KeyAgreementContext> {
        (self.descriptor.key_cipher_init)(self)
    }

    /// Begin a key derivation instance with the suite's KDF.
    pub fn key_derivation_init(&self) -> CryptoResult<KeyDerivationContext> {
        (self.descriptor.key_derivation_init)(self)
    }

    /// Key a block cipher instance for one direction.
    pub fn block_init(
        &self,
        key: &Buffer,
        encrypt: bool,
    ) -> CryptoResult<BlockContext> {
        (self.descriptor.block_init)(self, key, encrypt)
    }

    /// Key a stream cipher instance.
    pub fn stream_init(&self, key: &Buffer) -> CryptoResult<StreamContext> {
        (self.descriptor.stream_init)(self, key)
    }

    // ----------------------- typed buffer factories ----------------------

    /// Buffer sized for the suite hash's digest.
    pub fn buffer_for_hash(&self) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.hash_opts.hash_size())
    }

    /// Buffer sized for the signature algorithm's private key.
    pub fn buffer_for_signature_private_key(&self) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.sign_opts.private_key_size())
    }

    /// Buffer sized for the signature algorithm's public key.
    pub fn buffer_for_signature_public_key(&self) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.sign_opts.public_key_size())
    }

    /// Buffer sized for a signature.
    pub fn buffer_for_signature(&self) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.sign_opts.signature_size())
    }

    /// Buffer sized for the MAC key (`short_mac` selects which MAC).
    pub fn buffer_for_mac_private_key(
        &self,
        short_mac: bool,
    ) -> CryptoResult<Buffer> {
        let options = self.select_mac_options(short_mac)?;
        Buffer::init(&self.alloc, options.key_size())
    }

    /// Buffer sized for the MAC authentication code.
    pub fn buffer_for_mac_authentication_code(
        &self,
        short_mac: bool,
    ) -> CryptoResult<Buffer> {
        let options = self.select_mac_options(short_mac)?;
        Buffer::init(&self.alloc, options.mac_size())
    }

    /// Buffer sized for the auth key agreement private key.
    pub fn buffer_for_auth_key_agreement_private_key(
        &self,
    ) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.key_auth_opts.private_key_size())
    }

    /// Buffer sized for the auth key agreement public key.
    pub fn buffer_for_auth_key_agreement_public_key(
        &self,
    ) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.key_auth_opts.public_key_size())
    }

    /// Buffer sized for an auth key agreement nonce.
    pub fn buffer_for_auth_key_agreement_nonce(
        &self,
    ) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.key_auth_opts.minimum_nonce_size())
    }

    /// Buffer sized for the auth key agreement shared secret.
    pub fn buffer_for_auth_key_agreement_shared_secret(
        &self,
    ) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.key_auth_opts.shared_secret_size())
    }

    /// Buffer sized for the cipher key agreement private key.
    pub fn buffer_for_cipher_key_agreement_private_key(
        &self,
    ) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.key_cipher_opts.private_key_size())
    }

    /// Buffer sized for the cipher key agreement public key.
    pub fn buffer_for_cipher_key_agreement_public_key(
        &self,
    ) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.key_cipher_opts.public_key_size())
    }

    /// Buffer sized for a cipher key agreement nonce.
    pub fn buffer_for_cipher_key_agreement_nonce(
        &self,
    ) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.key_cipher_opts.minimum_nonce_size())
    }

    /// Buffer sized for the cipher key agreement shared secret.
    pub fn buffer_for_cipher_key_agreement_shared_secret(
        &self,
    ) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, self.key_cipher_opts.shared_secret_size())
    }

    /// Buffer sized for a raw UUID.
    pub fn buffer_for_uuid(&self) -> CryptoResult<Buffer> {
        Buffer::init(&self.alloc, UUID_SIZE)
    }

    fn select_mac_options(
        &self,
        short_mac: bool,
    ) -> CryptoResult<&MacOptions> {
        if short_mac {
            self.mac_short_opts
                .as_ref()
                .ok_or(CryptoError::MacOptionsInitMissingImpl)
        } else {
            Ok(&self.mac_opts)
        }
    }
}

// --------------------------- default thunks ----------------------------
//
// Registered suites delegate each family init to the suite-owned options;
// these shared thunks are what suite descriptors point at.

pub(crate) fn suite_hash_init(
    suite: &SuiteOptions,
) -> CryptoResult<HashContext> {
    suite.hash_opts.create_hash()
}

pub(crate) fn suite_sign_init(
    suite: &SuiteOptions,
) -> CryptoResult<SignatureContext> {
    suite.sign_opts.create_signature()
}

pub(crate) fn suite_prng_init(
    suite: &SuiteOptions,
) -> CryptoResult<PrngContext> {
    suite.prng_opts.create_prng()
}

pub(crate) fn suite_mac_init(
    suite: &SuiteOptions,
    key: &Buffer,
) -> CryptoResult<MacContext> {
    suite.mac_opts.create_mac(key)
}

pub(crate) fn suite_mac_short_init(
    suite: &SuiteOptions,
    key: &Buffer,
) -> CryptoResult<MacContext> {
    suite
        .mac_short_opts
        .as_ref()
        .ok_or(CryptoError::MacOptionsInitMissingImpl)?
        .create_mac(key)
}

pub(crate) fn suite_key_auth_init(
    suite: &SuiteOptions,
) -> CryptoResult<KeyAgreementContext> {
    suite.key_auth_opts.create_key_agreement()
}

pub(crate) fn suite_key_cipher_init(
    suite: &SuiteOptions,
) -> CryptoResult<KeyAgreementContext> {
    suite.key_cipher_opts.create_key_agreement()
}

pub(crate) fn suite_key_derivation_init(
    suite: &SuiteOptions,
) -> CryptoResult<KeyDerivationContext> {
    suite
        .key_derivation_opts
        .as_ref()
        .ok_or(CryptoError::KeyDerivationOptionsInitMissingImpl)?
        .create_key_derivation()
}

pub(crate) fn suite_block_init(
    suite: &SuiteOptions,
    key: &Buffer,
    encrypt: bool,
) -> CryptoResult<BlockContext> {
    suite.block_opts.create_cipher(key, encrypt)
}

pub(crate) fn suite_stream_init(
    suite: &SuiteOptions,
    key: &Buffer,
) -> CryptoResult<StreamContext> {
    suite.stream_opts.create_stream(key)
}

// ------------------------------ Velo V1 --------------------------------

static VELO_V1_DESCRIPTOR: SuiteDescriptor = SuiteDescriptor {
    suite_id: SUITE_VELO_V1,
    hash_alg: HASH_ALGORITHM_SHA_512,
    sign_alg: SIGNATURE_ALGORITHM_ED25519,
    prng_src: PRNG_SOURCE_OPERATING_SYSTEM,
    mac_alg: MAC_ALGORITHM_SHA_512_HMAC,
    mac_short_alg: None,
    key_auth_alg: KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512,
    key_cipher_alg: KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512_256,
    key_derivation_alg: None,
    key_derivation_hmac_alg: 0,
    block_cipher_alg: BLOCK_ALGORITHM_AES_256_2X_CBC,
    stream_cipher_alg: STREAM_ALGORITHM_AES_256_2X_CTR,
    hash_init: suite_hash_init,
    sign_init: suite_sign_init,
    prng_init: suite_prng_init,
    mac_init: suite_mac_init,
    mac_short_init: suite_mac_short_init,
    key_auth_init: suite_key_auth_init,
    key_cipher_init: suite_key_cipher_init,
    key_derivation_init: suite_key_derivation_init,
    block_init: suite_block_init,
    stream_init: suite_stream_init,
};

/// Register the Velo V1 crypto suite and every algorithm it selects.
/// Idempotent.
pub fn register_velo_v1() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        hash::register_sha_512();
        mac::register_sha_512_hmac();
        sign::register_ed25519();
        prng::register_source_operating_system();
        agreement::register_curve25519_sha512();
        agreement::register_curve25519_sha512_256();
        block::register_aes_256_2x_cbc();
        stream::register_aes_256_2x_ctr();

        registry::register(Registration {
            interface: INTERFACE_SUITE,
            implementation: SUITE_VELO_V1,
            features: SUITE_VELO_V1,
            descriptor: Descriptor::Suite(&VELO_V1_DESCRIPTOR),
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::system_allocator;

    fn velo_v1() -> SuiteOptions {
        register_velo_v1();
        SuiteOptions::init(&system_allocator(), SUITE_VELO_V1).unwrap()
    }

    #[test]
    fn missing_suite_is_reported() {
        assert_eq!(
            SuiteOptions::init(&system_allocator(), 0x0bad_0000)
                .unwrap_err(),
            CryptoError::SuiteOptionsInitMissingImpl
        );
    }

    // A suite whose stream selector was never registered: every earlier
    // family initializes, then the final step fails and unwinds them.
    static BROKEN_SUITE_DESCRIPTOR: SuiteDescriptor = SuiteDescriptor {
        suite_id: 0x0000_7357,
        hash_alg: HASH_ALGORITHM_SHA_512,
        sign_alg: SIGNATURE_ALGORITHM_ED25519,
        prng_src: PRNG_SOURCE_OPERATING_SYSTEM,
        mac_alg: MAC_ALGORITHM_SHA_512_HMAC,
        mac_short_alg: None,
        key_auth_alg: KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512,
        key_cipher_alg: KEY_AGREEMENT_ALGORITHM_CURVE25519_SHA512_256,
        key_derivation_alg: None,
        key_derivation_hmac_alg: 0,
        block_cipher_alg: BLOCK_ALGORITHM_AES_256_2X_CBC,
        stream_cipher_alg: 0x00BA_D000,
        hash_init: suite_hash_init,
        sign_init: suite_sign_init,
        prng_init: suite_prng_init,
        mac_init: suite_mac_init,
        mac_short_init: suite_mac_short_init,
        key_auth_init: suite_key_auth_init,
        key_cipher_init: suite_key_cipher_init,
        key_derivation_init: suite_key_derivation_init,
        block_init: suite_block_init,
        stream_init: suite_stream_init,
    };

    #[test]
    fn failed_sub_init_unwinds_and_reports_the_failing_family() {
        register_velo_v1();
        registry::register(Registration {
            interface: INTERFACE_SUITE,
            implementation: 0x0000_7357,
            features: 0x0000_7357,
            descriptor: Descriptor::Suite(&BROKEN_SUITE_DESCRIPTOR),
        });
        assert_eq!(
            SuiteOptions::init(&system_allocator(), 0x0000_7357)
                .unwrap_err(),
            CryptoError::StreamOptionsInitMissingImpl
        );
    }

    #[test]
    fn typed_buffers_have_the_pinned_sizes() {
        let suite = velo_v1();
        assert_eq!(suite.buffer_for_hash().unwrap().size(), 64);
        assert_eq!(
            suite.buffer_for_signature_private_key().unwrap().size(),
            64
        );
        assert_eq!(
            suite.buffer_for_signature_public_key().unwrap().size(),
            32
        );
        assert_eq!(suite.buffer_for_signature().unwrap().size(), 64);
        assert_eq!(
            suite.buffer_for_mac_private_key(false).unwrap().size(),
            64
        );
        assert_eq!(
            suite
                .buffer_for_mac_authentication_code(false)
                .unwrap()
                .size(),
            64
        );
        assert_eq!(
            suite
                .buffer_for_auth_key_agreement_private_key()
                .unwrap()
                .size(),
            32
        );
        assert_eq!(
            suite
                .buffer_for_auth_key_agreement_shared_secret()
                .unwrap()
                .size(),
            64
        );
        assert_eq!(
            suite.buffer_for_auth_key_agreement_nonce().unwrap().size(),
            64
        );
        assert_eq!(
            suite
                .buffer_for_cipher_key_agreement_shared_secret()
                .unwrap()
                .size(),
            32
        );
        assert_eq!(
            suite.buffer_for_cipher_key_agreement_nonce().unwrap().size(),
            32
        );
        assert_eq!(suite.buffer_for_uuid().unwrap().size(), 16);
    }

    #[test]
    fn unpinned_families_fail_with_missing_impl() {
        let suite = velo_v1();
        let key = suite.buffer_for_mac_private_key(false).unwrap();
        assert_eq!(
            suite.mac_short_init(&key).unwrap_err(),
            CryptoError::MacOptionsInitMissingImpl
        );
        assert_eq!(
            suite.key_derivation_init().unwrap_err(),
            CryptoError::KeyDerivationOptionsInitMissingImpl
        );
        assert_eq!(
            suite.buffer_for_mac_private_key(true).unwrap_err(),
            CryptoError::MacOptionsInitMissingImpl
        );
    }

    #[test]
    fn sign_and_verify_through_the_suite() {
        let suite = velo_v1();
        let mut signer = suite.digital_signature_init().unwrap();

        let mut private =
            suite.buffer_for_signature_private_key().unwrap();
        let mut public = suite.buffer_for_signature_public_key().unwrap();
        signer.keypair_create(&mut private, &mut public).unwrap();

        let message = b"transaction 0x2a: 10 units from a to b";
        let mut signature = suite.buffer_for_signature().unwrap();
        signer.sign(&mut signature, &private, message).unwrap();
        signer.verify(&signature, &public, message).unwrap();
    }

    #[test]
    fn key_agreement_through_the_suite_is_symmetric() {
        let suite = velo_v1();
        let mut agreement = suite.cipher_key_agreement_init().unwrap();

        let mut a_priv =
            suite.buffer_for_cipher_key_agreement_private_key().unwrap();
        let mut a_pub =
            suite.buffer_for_cipher_key_agreement_public_key().unwrap();
        agreement.keypair_create(&mut a_priv, &mut a_pub).unwrap();

        let mut b_priv =
            suite.buffer_for_cipher_key_agreement_private_key().unwrap();
        let mut b_pub =
            suite.buffer_for_cipher_key_agreement_public_key().unwrap();
        agreement.keypair_create(&mut b_priv, &mut b_pub).unwrap();

        // Server and client nonces from the suite PRNG.
        let mut prng = suite.prng_init().unwrap();
        let mut server_nonce =
            suite.buffer_for_cipher_key_agreement_nonce().unwrap();
        let nonce_size = server_nonce.size();
        prng.read(&mut server_nonce, nonce_size).unwrap();
        let mut client_nonce =
            suite.buffer_for_cipher_key_agreement_nonce().unwrap();
        prng.read(&mut client_nonce, nonce_size).unwrap();

        let mut ab =
            suite.buffer_for_cipher_key_agreement_shared_secret().unwrap();
        agreement
            .short_term_secret_create(
                &a_priv,
                &b_pub,
                &server_nonce,
                &client_nonce,
                &mut ab,
            )
            .unwrap();
        let mut ba =
            suite.buffer_for_cipher_key_agreement_shared_secret().unwrap();
        agreement
            .short_term_secret_create(
                &b_priv,
                &a_pub,
                &server_nonce,
                &client_nonce,
                &mut ba,
            )
            .unwrap();
        assert_eq!(ab.as_slice(), ba.as_slice());
    }

    #[test]
    fn ciphers_through_the_suite_round_trip() {
        let suite = velo_v1();
        let alloc = system_allocator();

        // Derive a cipher key via key agreement, then stream-encrypt.
        let mut agreement = suite.cipher_key_agreement_init().unwrap();
        let mut a_priv =
            suite.buffer_for_cipher_key_agreement_private_key().unwrap();
        let mut a_pub =
            suite.buffer_for_cipher_key_agreement_public_key().unwrap();
        agreement.keypair_create(&mut a_priv, &mut a_pub).unwrap();
        let mut b_priv =
            suite.buffer_for_cipher_key_agreement_private_key().unwrap();
        let mut b_pub =
            suite.buffer_for_cipher_key_agreement_public_key().unwrap();
        agreement.keypair_create(&mut b_priv, &mut b_pub).unwrap();

        let mut key =
            suite.buffer_for_cipher_key_agreement_shared_secret().unwrap();
        agreement
            .long_term_secret_create(&a_priv, &b_pub, &mut key)
            .unwrap();

        let plaintext = b"ledger snapshot, block 77";
        let mut iv = Buffer::init(&alloc, 16).unwrap();
        let mut prng = suite.prng_init().unwrap();
        prng.read(&mut iv, 16).unwrap();

        let mut enc = suite.stream_init(&key).unwrap();
        let mut ciphertext =
            Buffer::init(&alloc, 16 + plaintext.len()).unwrap();
        let mut offset = 0usize;
        enc.start_encryption(&iv, &mut ciphertext, &mut offset).unwrap();
        enc.encrypt(plaintext, &mut ciphertext, &mut offset).unwrap();

        let mut dec = suite.stream_init(&key).unwrap();
        let mut in_offset = 0usize;
        dec.start_decryption(&ciphertext, &mut in_offset).unwrap();
        let body = ciphertext.as_slice()[in_offset..].to_vec();
        let mut recovered =
            Buffer::init(&alloc, plaintext.len()).unwrap();
        let mut out_offset = 0usize;
        dec.decrypt(&body, &mut recovered, &mut out_offset).unwrap();
        assert_eq!(recovered.as_slice(), plaintext);
    }
}
