//! Stream cipher family: AES-256-CTR with resumable offsets
//!
//! The family contract frames a ciphertext as `IV || body`:
//! `start_encryption` writes the IV into the head of the output buffer and
//! leaves the offset just past it; `start_decryption` reads the IV back
//! from the input head. The `continue_*` operations rebind the keystream
//! at an arbitrary logical offset so an operation can resume into a
//! pre-offset buffer. `encrypt`/`decrypt` XOR keystream over `n` bytes and
//! advance the offset by `n`.
//!
//! A `(key, IV)` pair must be unique across all invocations for a given
//! key, since a reused pair repeats the keystream. The library
//! advertises this contract and enforces nothing beyond it.
//!
//! Keystream layout: the 16-byte IV is the initial 128-bit big-endian
//! counter block; keystream block `i` is `E_K(IV + i mod 2^128)`.

use std::any::Any;
use std::sync::{Arc, Once};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256;
use zeroize::Zeroize;

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::registry::{
    self, Descriptor, Registration, INTERFACE_STREAM_CIPHER,
};

/// Selector for AES-256-CTR in FIPS mode.
pub const STREAM_ALGORITHM_AES_256_CTR_FIPS: u32 = 0x0000_0100;
/// Selector for AES-256-CTR-2X mode.
pub const STREAM_ALGORITHM_AES_256_2X_CTR: u32 = 0x0000_0200;
/// Selector for AES-256-CTR-3X mode.
pub const STREAM_ALGORITHM_AES_256_3X_CTR: u32 = 0x0000_0400;
/// Selector for AES-256-CTR-4X mode.
pub const STREAM_ALGORITHM_AES_256_4X_CTR: u32 = 0x0000_0800;

const AES_256_KEY_SIZE: usize = 32;
const AES_BLOCK_SIZE: usize = 16;

/// A keyed stream cipher behind the family vtable.
///
/// The context layer validates sizes and offsets before dispatching, so
/// engines may assume well-formed arguments.
pub trait StreamEngine: Send {
    /// Write `iv` to the head of `output`, bind the keystream at logical
    /// position 0 and set `offset` just past the IV.
    fn start_encryption(
        &mut self,
        iv: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()>;

    /// Rebind the keystream for encryption resumed at buffer `offset`.
    fn continue_encryption(
        &mut self,
        iv: &[u8],
        offset: usize,
    ) -> CryptoResult<()>;

    /// Read the IV from the head of `input`, bind the keystream at logical
    /// position 0 and set `offset` just past the IV.
    fn start_decryption(
        &mut self,
        input: &[u8],
        offset: &mut usize,
    ) -> CryptoResult<()>;

    /// Rebind the keystream for decryption resumed at buffer `offset`.
    fn continue_decryption(
        &mut self,
        iv: &[u8],
        offset: usize,
    ) -> CryptoResult<()>;

    /// XOR keystream over `input`, writing to `output` at `offset` and
    /// advancing it.
    fn encrypt(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()>;

    /// XOR keystream over `input`, writing to `output` at `offset` and
    /// advancing it.
    fn decrypt(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()>;
}

/// Static descriptor for a stream cipher implementation.
pub struct StreamDescriptor {
    /// Algorithm selector.
    pub algorithm: u32,
    /// Key size in bytes.
    pub key_size: usize,
    /// IV size in bytes.
    pub iv_size: usize,
    /// Largest message the algorithm accepts, in bytes.
    pub maximum_message_size: u64,
    /// Engine constructor invoked by context init with the caller's key.
    pub(crate) new_engine:
        fn(&StreamOptions, &Buffer) -> CryptoResult<Box<dyn StreamEngine>>,
    /// Hook run once when the descriptor is cloned into live options.
    pub(crate) options_init:
        Option<fn(&mut StreamOptions) -> CryptoResult<()>>,
}

/// Live stream cipher options: a descriptor bound to an allocator.
#[derive(Clone)]
pub struct StreamOptions {
    descriptor: &'static StreamDescriptor,
    alloc: SharedAllocator,
    implementation: Option<Arc<dyn Any + Send + Sync>>,
}

impl StreamOptions {
    /// Resolve `algorithm` in the registry and bind it to `alloc`.
    pub fn init(
        alloc: &SharedAllocator,
        algorithm: u32,
    ) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_STREAM_CIPHER, algorithm)
            .ok_or(CryptoError::StreamOptionsInitMissingImpl)?;
        let Descriptor::StreamCipher(descriptor) = reg.descriptor else {
            return Err(CryptoError::StreamOptionsInitMissingImpl);
        };

        let mut options = StreamOptions {
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

    /// Key size in bytes.
    pub fn key_size(&self) -> usize {
        self.descriptor.key_size
    }

    /// IV size in bytes.
    pub fn iv_size(&self) -> usize {
        self.descriptor.iv_size
    }

    /// The allocator bound to these options.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// Key a stream cipher instance.
    pub fn create_stream(&self, key: &Buffer) -> CryptoResult<StreamContext> {
        if key.size() != self.descriptor.key_size {
            return Err(CryptoError::StreamInitBadEncryptionKey);
        }
        let engine = (self.descriptor.new_engine)(self, key)?;
        Ok(StreamContext { options: self.clone(), engine })
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

/// A keyed stream cipher instance.
pub struct StreamContext {
    options: StreamOptions,
    engine: Box<dyn StreamEngine>,
}

impl std::fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamContext").finish_non_exhaustive()
    }
}

impl StreamContext {
    /// The options this context was created from.
    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Begin encryption: write `iv` into the head of `output` and set
    /// `offset` past it. The IV must only ever be used once per key.
    pub fn start_encryption(
        &mut self,
        iv: &Buffer,
        output: &mut Buffer,
        offset: &mut usize,
    ) -> CryptoResult<()> {
        let iv_size = self.options.iv_size();
        if iv.size() != iv_size || output.size() < iv_size {
            return Err(CryptoError::StreamStartEncryptionInvalidArg);
        }
        self.engine.start_encryption(
            iv.as_slice(),
            output.as_mut_slice(),
            offset,
        )
    }

    /// Resume encryption into a buffer already holding `offset` bytes of
    /// ciphertext framing (IV included).
    pub fn continue_encryption(
        &mut self,
        iv: &Buffer,
        offset: usize,
    ) -> CryptoResult<()> {
        let iv_size = self.options.iv_size();
        if iv.size() != iv_size || offset < iv_size {
            return Err(CryptoError::StreamStartEncryptionInvalidArg);
        }
        self.engine.continue_encryption(iv.as_slice(), offset)
    }

    /// Begin decryption: read the IV from the head of `input` and set
    /// `offset` past it.
    pub fn start_decryption(
        &mut self,
        input: &Buffer,
        offset: &mut usize,
    ) -> CryptoResult<()> {
        if input.size() < self.options.iv_size() {
            return Err(CryptoError::StreamStartEncryptionInvalidArg);
        }
        self.engine.start_decryption(input.as_slice(), offset)
    }

    /// Resume decryption at `offset` bytes into the ciphertext framing.
    pub fn continue_decryption(
        &mut self,
        iv: &Buffer,
        offset: usize,
    ) -> CryptoResult<()> {
        let iv_size = self.options.iv_size();
        if iv.size() != iv_size || offset < iv_size {
            return Err(CryptoError::StreamStartEncryptionInvalidArg);
        }
        self.engine.continue_decryption(iv.as_slice(), offset)
    }

    /// Encrypt `input`, writing ciphertext to `output` at `*offset` and
    /// advancing it by the input length.
    pub fn encrypt(
        &mut self,
        input: &[u8],
        output: &mut Buffer,
        offset: &mut usize,
    ) -> CryptoResult<()> {
        self.check_crypt_bounds(input, output, *offset)?;
        self.engine.encrypt(input, output.as_mut_slice(), offset)
    }

    /// Decrypt `input`, writing plaintext to `output` at `*offset` and
    /// advancing it by the input length.
    pub fn decrypt(
        &mut self,
        input: &[u8],
        output: &mut Buffer,
        offset: &mut usize,
    ) -> CryptoResult<()> {
        self.check_crypt_bounds(input, output, *offset)?;
        self.engine.decrypt(input, output.as_mut_slice(), offset)
    }

    fn check_crypt_bounds(
        &self,
        input: &[u8],
        output: &Buffer,
        offset: usize,
    ) -> CryptoResult<()> {
        let end = offset
            .checked_add(input.len())
            .ok_or(CryptoError::StreamStartEncryptionInvalidArg)?;
        if end > output.size() {
            return Err(CryptoError::StreamStartEncryptionInvalidArg);
        }
        Ok(())
    }
}

// --------------------------- AES-CTR engine ----------------------------

/// CTR keystream generator over the AES-256 block function.
struct AesCtrEngine {
    cipher: Aes256,
    iv_size: usize,
    counter: u128,
    keystream: [u8; AES_BLOCK_SIZE],
    used: usize,
}

impl Drop for AesCtrEngine {
    fn drop(&mut self) {
        self.keystream.zeroize();
        self.counter = 0;
    }
}

impl AesCtrEngine {
    /// Bind the keystream at logical byte `position` of the stream keyed
    /// by `iv`.
    fn seek(&mut self, iv: &[u8], position: u64) {
        let base = u128::from_be_bytes(
            iv.try_into().expect("context layer validated the IV size"),
        );
        let block = position / AES_BLOCK_SIZE as u64;
        self.counter = base.wrapping_add(u128::from(block));
        self.refill();
        self.used = (position % AES_BLOCK_SIZE as u64) as usize;
    }

    /// Encrypt the current counter block into the keystream buffer and
    /// advance the counter.
    fn refill(&mut self) {
        let mut block = GenericArray::from(self.counter.to_be_bytes());
        self.cipher.encrypt_block(&mut block);
        self.keystream.copy_from_slice(&block);
        self.counter = self.counter.wrapping_add(1);
        self.used = 0;
    }

    /// XOR keystream over `input` into `output[*offset..]`.
    fn crypt(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        for (i, &byte) in input.iter().enumerate() {
            if self.used == AES_BLOCK_SIZE {
                self.refill();
            }
            output[*offset + i] = byte ^ self.keystream[self.used];
            self.used += 1;
        }
        *offset += input.len();
        Ok(())
    }
}

impl StreamEngine for AesCtrEngine {
    fn start_encryption(
        &mut self,
        iv: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        output[..self.iv_size].copy_from_slice(iv);
        self.seek(iv, 0);
        *offset = self.iv_size;
        Ok(())
    }

    fn continue_encryption(
        &mut self,
        iv: &[u8],
        offset: usize,
    ) -> CryptoResult<()> {
        self.seek(iv, (offset - self.iv_size) as u64);
        Ok(())
    }

    fn start_decryption(
        &mut self,
        input: &[u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        let iv = input[..self.iv_size].to_vec();
        self.seek(&iv, 0);
        *offset = self.iv_size;
        Ok(())
    }

    fn continue_decryption(
        &mut self,
        iv: &[u8],
        offset: usize,
    ) -> CryptoResult<()> {
        self.seek(iv, (offset - self.iv_size) as u64);
        Ok(())
    }

    fn encrypt(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        self.crypt(input, output, offset)
    }

    fn decrypt(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        offset: &mut usize,
    ) -> CryptoResult<()> {
        self.crypt(input, output, offset)
    }
}

fn new_aes_ctr_engine(
    options: &StreamOptions,
    key: &Buffer,
) -> CryptoResult<Box<dyn StreamEngine>> {
    let cipher = Aes256::new_from_slice(key.as_slice())
        .map_err(|_| CryptoError::StreamInitBadEncryptionKey)?;
    Ok(Box::new(AesCtrEngine {
        cipher,
        iv_size: options.iv_size(),
        counter: 0,
        keystream: [0u8; AES_BLOCK_SIZE],
        used: AES_BLOCK_SIZE,
    }))
}

macro_rules! aes_ctr_impl {
    ($register:ident, $descriptor:ident, $selector:expr) => {
        static $descriptor: StreamDescriptor = StreamDescriptor {
            algorithm: $selector,
            key_size: AES_256_KEY_SIZE,
            iv_size: AES_BLOCK_SIZE,
            maximum_message_size: u64::MAX,
            new_engine: new_aes_ctr_engine,
            options_init: None,
        };

        /// Register this AES-256-CTR selector. Idempotent.
        pub fn $register() {
            static REGISTERED: Once = Once::new();
            REGISTERED.call_once(|| {
                registry::register(Registration {
                    interface: INTERFACE_STREAM_CIPHER,
                    implementation: $selector,
                    features: $selector,
                    descriptor: Descriptor::StreamCipher(&$descriptor),
                });
            });
        }
    };
}

aes_ctr_impl!(
    register_aes_256_ctr_fips, AES_256_CTR_FIPS_DESCRIPTOR,
    STREAM_ALGORITHM_AES_256_CTR_FIPS
);
aes_ctr_impl!(
    register_aes_256_2x_ctr, AES_256_2X_CTR_DESCRIPTOR,
    STREAM_ALGORITHM_AES_256_2X_CTR
);
aes_ctr_impl!(
    register_aes_256_3x_ctr, AES_256_3X_CTR_DESCRIPTOR,
    STREAM_ALGORITHM_AES_256_3X_CTR
);
aes_ctr_impl!(
    register_aes_256_4x_ctr, AES_256_4X_CTR_DESCRIPTOR,
    STREAM_ALGORITHM_AES_256_4X_CTR
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::system_allocator;

    fn options_for(algorithm: u32) -> StreamOptions {
        register_aes_256_ctr_fips();
        register_aes_256_2x_ctr();
        register_aes_256_3x_ctr();
        register_aes_256_4x_ctr();
        StreamOptions::init(&system_allocator(), algorithm).unwrap()
    }

    fn key() -> Buffer {
        Buffer::from_slice(&system_allocator(), &[0x2Bu8; 32]).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let alloc = system_allocator();
        let options = options_for(STREAM_ALGORITHM_AES_256_2X_CTR);
        let plaintext = b"attack at dawn, retreat at dusk";
        let iv = Buffer::from_slice(&alloc, &[0x11u8; 16]).unwrap();

        let mut enc = options.create_stream(&key()).unwrap();
        let mut ciphertext =
            Buffer::init(&alloc, 16 + plaintext.len()).unwrap();
        let mut offset = 0usize;
        enc.start_encryption(&iv, &mut ciphertext, &mut offset).unwrap();
        assert_eq!(offset, 16);
        enc.encrypt(plaintext, &mut ciphertext, &mut offset).unwrap();
        assert_eq!(offset, ciphertext.size());
        assert_eq!(&ciphertext.as_slice()[..16], iv.as_slice());
        assert_ne!(&ciphertext.as_slice()[16..], plaintext.as_slice());

        let mut dec = options.create_stream(&key()).unwrap();
        let mut recovered =
            Buffer::init(&alloc, plaintext.len()).unwrap();
        let mut in_offset = 0usize;
        dec.start_decryption(&ciphertext, &mut in_offset).unwrap();
        assert_eq!(in_offset, 16);
        let body = ciphertext.as_slice()[in_offset..].to_vec();
        let mut out_offset = 0usize;
        dec.decrypt(&body, &mut recovered, &mut out_offset).unwrap();
        assert_eq!(recovered.as_slice(), plaintext);
    }

    #[test]
    fn chunked_and_one_shot_keystreams_agree() {
        let alloc = system_allocator();
        let options = options_for(STREAM_ALGORITHM_AES_256_CTR_FIPS);
        let plaintext: Vec<u8> = (0u8..100).collect();
        let iv = Buffer::from_slice(&alloc, &[0x42u8; 16]).unwrap();

        let mut one_shot = options.create_stream(&key()).unwrap();
        let mut a = Buffer::init(&alloc, 16 + plaintext.len()).unwrap();
        let mut offset = 0usize;
        one_shot.start_encryption(&iv, &mut a, &mut offset).unwrap();
        one_shot.encrypt(&plaintext, &mut a, &mut offset).unwrap();

        // Same IV, 7-byte chunks: identical ciphertext.
        let mut chunked = options.create_stream(&key()).unwrap();
        let mut b = Buffer::init(&alloc, 16 + plaintext.len()).unwrap();
        let mut offset = 0usize;
        chunked.start_encryption(&iv, &mut b, &mut offset).unwrap();
        for chunk in plaintext.chunks(7) {
            chunked.encrypt(chunk, &mut b, &mut offset).unwrap();
        }
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn continue_encryption_resumes_mid_stream() {
        let alloc = system_allocator();
        let options = options_for(STREAM_ALGORITHM_AES_256_2X_CTR);
        let plaintext: Vec<u8> = (0u8..64).map(|i| i ^ 0xA7).collect();
        let iv = Buffer::from_slice(&alloc, &[0x09u8; 16]).unwrap();

        let mut full = options.create_stream(&key()).unwrap();
        let mut expected =
            Buffer::init(&alloc, 16 + plaintext.len()).unwrap();
        let mut offset = 0usize;
        full.start_encryption(&iv, &mut expected, &mut offset).unwrap();
        full.encrypt(&plaintext, &mut expected, &mut offset).unwrap();

        // Front half with one context, back half with a fresh context
        // resumed at an unaligned offset.
        let split = 21usize;
        let mut resumed = options.create_stream(&key()).unwrap();
        let mut actual =
            Buffer::init(&alloc, 16 + plaintext.len()).unwrap();
        let mut offset = 0usize;
        resumed.start_encryption(&iv, &mut actual, &mut offset).unwrap();
        resumed
            .encrypt(&plaintext[..split], &mut actual, &mut offset)
            .unwrap();

        let mut late = options.create_stream(&key()).unwrap();
        late.continue_encryption(&iv, 16 + split).unwrap();
        let mut offset = 16 + split;
        late.encrypt(&plaintext[split..], &mut actual, &mut offset)
            .unwrap();

        assert_eq!(expected.as_slice(), actual.as_slice());
    }

    #[test]
    fn continue_decryption_resumes_mid_stream() {
        let alloc = system_allocator();
        let options = options_for(STREAM_ALGORITHM_AES_256_2X_CTR);
        let plaintext: Vec<u8> = (0u8..48).collect();
        let iv = Buffer::from_slice(&alloc, &[0x5Au8; 16]).unwrap();

        let mut enc = options.create_stream(&key()).unwrap();
        let mut ciphertext =
            Buffer::init(&alloc, 16 + plaintext.len()).unwrap();
        let mut offset = 0usize;
        enc.start_encryption(&iv, &mut ciphertext, &mut offset).unwrap();
        enc.encrypt(&plaintext, &mut ciphertext, &mut offset).unwrap();

        // Decrypt only the back half via continue_decryption.
        let split = 19usize;
        let mut dec = options.create_stream(&key()).unwrap();
        dec.continue_decryption(&iv, 16 + split).unwrap();
        let body = ciphertext.as_slice()[16 + split..].to_vec();
        let mut out = Buffer::init(&alloc, plaintext.len() - split).unwrap();
        let mut out_offset = 0usize;
        dec.decrypt(&body, &mut out, &mut out_offset).unwrap();
        assert_eq!(out.as_slice(), &plaintext[split..]);
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let alloc = system_allocator();
        let options = options_for(STREAM_ALGORITHM_AES_256_2X_CTR);

        let short_key = Buffer::init(&alloc, 16).unwrap();
        assert_eq!(
            options.create_stream(&short_key).unwrap_err(),
            CryptoError::StreamInitBadEncryptionKey
        );

        let mut stream = options.create_stream(&key()).unwrap();
        let bad_iv = Buffer::init(&alloc, 8).unwrap();
        let mut out = Buffer::init(&alloc, 32).unwrap();
        let mut offset = 0usize;
        assert_eq!(
            stream
                .start_encryption(&bad_iv, &mut out, &mut offset)
                .unwrap_err(),
            CryptoError::StreamStartEncryptionInvalidArg
        );

        let iv = Buffer::init(&alloc, 16).unwrap();
        // Resuming before the IV boundary is meaningless.
        assert_eq!(
            stream.continue_encryption(&iv, 15).unwrap_err(),
            CryptoError::StreamStartEncryptionInvalidArg
        );

        // Writing past the output buffer is rejected up front.
        let mut small = Buffer::init(&alloc, 20).unwrap();
        let mut offset = 0usize;
        stream
            .start_encryption(&iv, &mut small, &mut offset)
            .unwrap();
        assert_eq!(
            stream
                .encrypt(&[0u8; 8], &mut small, &mut offset)
                .unwrap_err(),
            CryptoError::StreamStartEncryptionInvalidArg
        );
    }
}
