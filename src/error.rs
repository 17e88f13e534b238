//! Error taxonomy with wire-stable status codes
//!
//! Every fallible operation in this crate returns [`CryptoError`]. Each
//! variant maps to a fixed 16-bit status code via [`CryptoError::code`];
//! `0x0000` means success and is represented by `Ok(())`, so no variant
//! carries it. The numbering is organized in per-family ranges (stream
//! 0x2100+, PRNG 0x210F+, suite 0x211D+, signature 0x2121+, key agreement
//! 0x2129+, hash 0x2135+, block 0x2145+, buffer 0x2150+, MAC 0x2160+, key
//! derivation 0x2170+, mock 0x2190+). These codes cross process boundaries
//! in peer protocols and must never be renumbered.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Status codes for all cryptographic families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CryptoError {
    /// The stream cipher selector does not exist or was not registered.
    #[error("stream cipher algorithm selector is invalid or unregistered")]
    StreamOptionsInitMissingImpl,

    /// An invalid argument was provided to stream cipher init.
    #[error("invalid argument to stream cipher init")]
    StreamInitInvalidArg,

    /// Stream cipher init ran out of memory.
    #[error("out of memory initializing stream cipher")]
    StreamInitOutOfMemory,

    /// The provided key does not work with the selected stream cipher.
    #[error("bad encryption key for stream cipher")]
    StreamInitBadEncryptionKey,

    /// An invalid argument was provided when starting or continuing a
    /// stream cipher operation.
    #[error("invalid argument starting stream encryption")]
    StreamStartEncryptionInvalidArg,

    /// The CPRNG source selector does not exist or was not registered.
    #[error("prng source selector is invalid or unregistered")]
    PrngOptionsInitMissingImpl,

    /// PRNG init ran out of memory.
    #[error("out of memory initializing prng")]
    PrngInitOutOfMemory,

    /// The PRNG source failed to open a device handle.
    #[error("failed to open prng device")]
    PrngInitDeviceOpenFailure,

    /// The PRNG failed to produce the requested bytes.
    #[error("prng read failure")]
    PrngReadFailure,

    /// The requested PRNG read would overwrite the destination buffer.
    #[error("prng read would overwrite destination buffer")]
    PrngReadWouldOverwrite,

    /// The suite selector does not exist or was not registered.
    #[error("crypto suite selector is invalid or unregistered")]
    SuiteOptionsInitMissingImpl,

    /// An invalid argument was provided to digital signature init.
    #[error("invalid argument to digital signature init")]
    SignatureInitInvalidArg,

    /// The signature did not verify against the public key and message.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// The signature algorithm selector does not exist or was not
    /// registered.
    #[error("digital signature selector is invalid or unregistered")]
    SignatureOptionsInitMissingImpl,

    /// An invalid argument was provided to short-term secret creation.
    #[error("invalid argument creating short-term secret")]
    KeyAgreementShortTermCreateInvalidArg,

    /// The key agreement selector does not exist or was not registered.
    #[error("key agreement selector is invalid or unregistered")]
    KeyAgreementOptionsInitMissingImpl,

    /// An invalid argument was provided to key agreement init.
    #[error("invalid argument to key agreement init")]
    KeyAgreementInitInvalidArg,

    /// The hash selector does not exist or was not registered.
    #[error("hash algorithm selector is invalid or unregistered")]
    HashOptionsInitMissingImpl,

    /// An invalid argument was provided to hash init.
    #[error("invalid argument to hash init")]
    HashInitInvalidArg,

    /// Hash init ran out of memory.
    #[error("out of memory initializing hash")]
    HashInitOutOfMemory,

    /// An invalid argument was provided to hash digest.
    #[error("invalid argument to hash digest")]
    HashDigestInvalidArg,

    /// An invalid argument was provided to hash finalize.
    #[error("invalid argument to hash finalize")]
    HashFinalizeInvalidArg,

    /// The block cipher selector does not exist or was not registered.
    #[error("block cipher selector is invalid or unregistered")]
    BlockOptionsInitMissingImpl,

    /// An invalid argument was provided to block cipher init or a block
    /// operation.
    #[error("invalid argument to block cipher operation")]
    BlockInitInvalidArg,

    /// A bad allocator was provided to block cipher init.
    #[error("bad allocator for block cipher init")]
    BlockInitBadAllocator,

    /// The provided encryption key does not fit the block cipher.
    #[error("bad encryption key for block cipher")]
    BlockInitBadEncryptionKey,

    /// The provided decryption key does not fit the block cipher.
    #[error("bad decryption key for block cipher")]
    BlockInitBadDecryptionKey,

    /// Buffer initialization ran out of memory.
    #[error("out of memory initializing buffer")]
    BufferInitOutOfMemory,

    /// The requested read would overwrite the destination buffer.
    #[error("read would overwrite destination buffer")]
    BufferReadWouldOverwrite,

    /// The requested write would overwrite the destination buffer.
    #[error("write would overwrite destination buffer")]
    BufferWriteWouldOverwrite,

    /// A buffer argument was invalid.
    #[error("invalid buffer argument")]
    BufferInvalidArgument,

    /// A buffer copy was attempted between mismatched sizes.
    #[error("mismatched buffer sizes in copy")]
    BufferCopyMismatchedSizes,

    /// The padding in a padded buffer does not match PKCS#7 rules.
    #[error("invalid padding scheme")]
    BufferPaddingSchemeInvalid,

    /// The MAC selector does not exist or was not registered.
    #[error("mac algorithm selector is invalid or unregistered")]
    MacOptionsInitMissingImpl,

    /// MAC init ran out of memory.
    #[error("out of memory initializing mac")]
    MacInitOutOfMemory,

    /// An invalid argument was provided to MAC init.
    #[error("invalid argument to mac init")]
    MacInitInvalidArg,

    /// The provided key does not fit the selected MAC algorithm.
    #[error("invalid key for mac algorithm")]
    MacInitInvalidKey,

    /// An invalid argument was provided to MAC digest.
    #[error("invalid argument to mac digest")]
    MacDigestInvalidArg,

    /// An invalid argument was provided to MAC finalize.
    #[error("invalid argument to mac finalize")]
    MacFinalizeInvalidArg,

    /// An invalid argument was provided to the PBKDF2 core.
    #[error("invalid argument to pbkdf2")]
    Pbkdf2InvalidArg,

    /// The PBKDF2 core ran out of memory.
    #[error("out of memory in pbkdf2")]
    Pbkdf2InitOutOfMemory,

    /// The key derivation selector does not exist or was not registered.
    #[error("key derivation selector is invalid or unregistered")]
    KeyDerivationOptionsInitMissingImpl,

    /// The HMAC selector given to key derivation options does not exist or
    /// was not registered.
    #[error("key derivation hmac selector is invalid or unregistered")]
    KeyDerivationOptionsInitMissingHmacImpl,

    /// An invalid argument was provided to key derivation init.
    #[error("invalid argument to key derivation init")]
    KeyDerivationInitInvalidArg,

    /// An invalid argument was provided to derive_key.
    #[error("invalid argument to derive_key")]
    KeyDerivationDeriveKeyInvalidArg,

    /// A mocked method was invoked without a mock having been installed.
    #[error("mock called without a mocked function")]
    MockNotAdded,
}

impl CryptoError {
    /// The wire-stable 16-bit status code for this error.
    pub const fn code(self) -> u16 {
        match self {
            CryptoError::StreamOptionsInitMissingImpl => 0x2100,
            CryptoError::StreamInitInvalidArg => 0x2105,
            CryptoError::StreamInitOutOfMemory => 0x2106,
            CryptoError::StreamInitBadEncryptionKey => 0x2107,
            CryptoError::StreamStartEncryptionInvalidArg => 0x210B,
            CryptoError::PrngOptionsInitMissingImpl => 0x210F,
            CryptoError::PrngInitOutOfMemory => 0x2113,
            CryptoError::PrngInitDeviceOpenFailure => 0x2114,
            CryptoError::PrngReadFailure => 0x2118,
            CryptoError::PrngReadWouldOverwrite => 0x2119,
            CryptoError::SuiteOptionsInitMissingImpl => 0x211D,
            CryptoError::SignatureInitInvalidArg => 0x2121,
            CryptoError::SignatureVerificationFailed => 0x2122,
            CryptoError::SignatureOptionsInitMissingImpl => 0x2125,
            CryptoError::KeyAgreementShortTermCreateInvalidArg => 0x2129,
            CryptoError::KeyAgreementOptionsInitMissingImpl => 0x212D,
            CryptoError::KeyAgreementInitInvalidArg => 0x2131,
            CryptoError::HashOptionsInitMissingImpl => 0x2135,
            CryptoError::HashInitInvalidArg => 0x2139,
            CryptoError::HashInitOutOfMemory => 0x213A,
            CryptoError::HashDigestInvalidArg => 0x213D,
            CryptoError::HashFinalizeInvalidArg => 0x2141,
            CryptoError::BlockOptionsInitMissingImpl => 0x2145,
            CryptoError::BlockInitInvalidArg => 0x2149,
            CryptoError::BlockInitBadAllocator => 0x214A,
            CryptoError::BlockInitBadEncryptionKey => 0x214B,
            CryptoError::BlockInitBadDecryptionKey => 0x214C,
            CryptoError::BufferInitOutOfMemory => 0x2150,
            CryptoError::BufferReadWouldOverwrite => 0x2154,
            CryptoError::BufferWriteWouldOverwrite => 0x2158,
            CryptoError::BufferInvalidArgument => 0x2159,
            CryptoError::BufferCopyMismatchedSizes => 0x215C,
            CryptoError::BufferPaddingSchemeInvalid => 0x215D,
            CryptoError::MacOptionsInitMissingImpl => 0x2160,
            CryptoError::MacInitOutOfMemory => 0x2164,
            CryptoError::MacInitInvalidArg => 0x2165,
            CryptoError::MacInitInvalidKey => 0x2166,
            CryptoError::MacDigestInvalidArg => 0x2168,
            CryptoError::MacFinalizeInvalidArg => 0x216C,
            CryptoError::Pbkdf2InvalidArg => 0x2170,
            CryptoError::Pbkdf2InitOutOfMemory => 0x2174,
            CryptoError::KeyDerivationOptionsInitMissingImpl => 0x2178,
            CryptoError::KeyDerivationOptionsInitMissingHmacImpl => 0x217A,
            CryptoError::KeyDerivationInitInvalidArg => 0x217C,
            CryptoError::KeyDerivationDeriveKeyInvalidArg => 0x2180,
            CryptoError::MockNotAdded => 0x2190,
        }
    }
}
