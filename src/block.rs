//! Block cipher family: AES-256-CBC chaining
//!
//! The family contract covers exactly one block per call and defines only
//! the chaining rule; callers supply the IV for block 0 (which must be
//! unpredictable) and the previous ciphertext block for every block after
//! it. The library holds no chaining state.
//!
//! CBC per NIST SP 800-38A: `C_i = E_K(P_i ⊕ IV_i)` on encrypt and
//! `P_i = D_K(C_i) ⊕ IV_i` on decrypt, with the AES-256 block function as
//! the external engine. The FIPS/2X/3X/4X selectors are distinct
//! registered algorithms sharing this contract.

use std::any::Any;
use std::sync::{Arc, Once};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::registry::{
    self, Descriptor, Registration, INTERFACE_BLOCK_CIPHER,
};

/// Selector for AES-256-CBC in FIPS mode.
pub const BLOCK_ALGORITHM_AES_256_CBC_FIPS: u32 = 0x0100_0000;
/// Selector for AES-256-CBC-2X mode.
pub const BLOCK_ALGORITHM_AES_256_2X_CBC: u32 = 0x0200_0000;
/// Selector for AES-256-CBC-3X mode.
pub const BLOCK_ALGORITHM_AES_256_3X_CBC: u32 = 0x0400_0000;
/// Selector for AES-256-CBC-4X mode.
pub const BLOCK_ALGORITHM_AES_256_4X_CBC: u32 = 0x0800_0000;

const AES_256_KEY_SIZE: usize = 32;
const AES_BLOCK_SIZE: usize = 16;

/// A keyed block cipher behind the family vtable.
pub trait BlockEngine: Send {
    /// Encrypt one block: `output = E_K(input ⊕ iv)`.
    fn encrypt(
        &mut self,
        iv: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> CryptoResult<()>;

    /// Decrypt one block: `output = D_K(input) ⊕ iv`.
    fn decrypt(
        &mut self,
        iv: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> CryptoResult<()>;
}

/// Static descriptor for a block cipher implementation.
pub struct BlockDescriptor {
    /// Algorithm selector.
    pub algorithm: u32,
    /// Key size in bytes.
    pub key_size: usize,
    /// IV (and block) size in bytes.
    pub iv_size: usize,
    /// Largest message the algorithm accepts, in bytes.
    pub maximum_message_size: u64,
    /// Engine constructor invoked by context init with the caller's key.
    pub(crate) new_engine: fn(
        &BlockOptions,
        &Buffer,
        bool,
    ) -> CryptoResult<Box<dyn BlockEngine>>,
    /// Hook run once when the descriptor is cloned into live options.
    pub(crate) options_init:
        Option<fn(&mut BlockOptions) -> CryptoResult<()>>,
}

/// Live block cipher options: a descriptor bound to an allocator.
#[derive(Clone)]
pub struct BlockOptions {
    descriptor: &'static BlockDescriptor,
    alloc: SharedAllocator,
    implementation: Option<Arc<dyn Any + Send + Sync>>,
}

impl BlockOptions {
    /// Resolve `algorithm` in the registry and bind it to `alloc`.
    pub fn init(
        alloc: &SharedAllocator,
        algorithm: u32,
    ) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_BLOCK_CIPHER, algorithm)
            .ok_or(CryptoError::BlockOptionsInitMissingImpl)?;
        let Descriptor::BlockCipher(descriptor) = reg.descriptor else {
            return Err(CryptoError::BlockOptionsInitMissingImpl);
        };

        let mut options = BlockOptions {
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

    /// IV (and block) size in bytes.
    pub fn iv_size(&self) -> usize {
        self.descriptor.iv_size
    }

    /// The allocator bound to these options.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// Key a cipher instance for one direction.
    pub fn create_cipher(
        &self,
        key: &Buffer,
        encrypt: bool,
    ) -> CryptoResult<BlockContext> {
        if key.size() != self.descriptor.key_size {
            return Err(if encrypt {
                CryptoError::BlockInitBadEncryptionKey
            } else {
                CryptoError::BlockInitBadDecryptionKey
            });
        }
        let engine = (self.descriptor.new_engine)(self, key, encrypt)?;
        Ok(BlockContext { options: self.clone(), engine, encrypt })
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

/// A keyed, direction-bound block cipher instance.
pub struct BlockContext {
    options: BlockOptions,
    engine: Box<dyn BlockEngine>,
    encrypt: bool,
}

impl std::fmt::Debug for BlockContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockContext").finish_non_exhaustive()
    }
}

impl BlockContext {
    /// The options this context was created from.
    pub fn options(&self) -> &BlockOptions {
        &self.options
    }

    /// Encrypt one block. `iv` is the IV for block 0 or the previous
    /// ciphertext block otherwise; all three regions must be exactly one
    /// block.
    pub fn encrypt(
        &mut self,
        iv: &[u8],
        input: &[u8],
        output: &mut Buffer,
    ) -> CryptoResult<()> {
        self.check_block_args(iv, input, output, true)?;
        self.engine.encrypt(iv, input, output.as_mut_slice())
    }

    /// Decrypt one block. `iv` is the IV for block 0 or the previous
    /// ciphertext block otherwise.
    pub fn decrypt(
        &mut self,
        iv: &[u8],
        input: &[u8],
        output: &mut Buffer,
    ) -> CryptoResult<()> {
        self.check_block_args(iv, input, output, false)?;
        self.engine.decrypt(iv, input, output.as_mut_slice())
    }

    fn check_block_args(
        &self,
        iv: &[u8],
        input: &[u8],
        output: &Buffer,
        encrypt: bool,
    ) -> CryptoResult<()> {
        let block = self.options.iv_size();
        if iv.len() != block
            || input.len() != block
            || output.size() != block
            || self.encrypt != encrypt
        {
            return Err(CryptoError::BlockInitInvalidArg);
        }
        Ok(())
    }
}

// ------------------------------ AES engine -----------------------------

struct AesCbcEngine {
    cipher: Aes256,
}

impl BlockEngine for AesCbcEngine {
    fn encrypt(
        &mut self,
        iv: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> CryptoResult<()> {
        let mut block = GenericArray::clone_from_slice(input);
        for (b, v) in block.iter_mut().zip(iv) {
            *b ^= v;
        }
        self.cipher.encrypt_block(&mut block);
        output.copy_from_slice(&block);
        Ok(())
    }

    fn decrypt(
        &mut self,
        iv: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> CryptoResult<()> {
        let mut block = GenericArray::clone_from_slice(input);
        self.cipher.decrypt_block(&mut block);
        for (b, v) in block.iter_mut().zip(iv) {
            *b ^= v;
        }
        output.copy_from_slice(&block);
        Ok(())
    }
}

fn new_aes_cbc_engine(
    _options: &BlockOptions,
    key: &Buffer,
    _encrypt: bool,
) -> CryptoResult<Box<dyn BlockEngine>> {
    let cipher = Aes256::new_from_slice(key.as_slice())
        .map_err(|_| CryptoError::BlockInitBadEncryptionKey)?;
    Ok(Box::new(AesCbcEngine { cipher }))
}

macro_rules! aes_cbc_impl {
    ($register:ident, $descriptor:ident, $selector:expr) => {
        static $descriptor: BlockDescriptor = BlockDescriptor {
            algorithm: $selector,
            key_size: AES_256_KEY_SIZE,
            iv_size: AES_BLOCK_SIZE,
            maximum_message_size: u64::MAX,
            new_engine: new_aes_cbc_engine,
            options_init: None,
        };

        /// Register this AES-256-CBC selector. Idempotent.
        pub fn $register() {
            static REGISTERED: Once = Once::new();
            REGISTERED.call_once(|| {
                registry::register(Registration {
                    interface: INTERFACE_BLOCK_CIPHER,
                    implementation: $selector,
                    features: $selector,
                    descriptor: Descriptor::BlockCipher(&$descriptor),
                });
            });
        }
    };
}

aes_cbc_impl!(
    register_aes_256_cbc_fips, AES_256_CBC_FIPS_DESCRIPTOR,
    BLOCK_ALGORITHM_AES_256_CBC_FIPS
);
aes_cbc_impl!(
    register_aes_256_2x_cbc, AES_256_2X_CBC_DESCRIPTOR,
    BLOCK_ALGORITHM_AES_256_2X_CBC
);
aes_cbc_impl!(
    register_aes_256_3x_cbc, AES_256_3X_CBC_DESCRIPTOR,
    BLOCK_ALGORITHM_AES_256_3X_CBC
);
aes_cbc_impl!(
    register_aes_256_4x_cbc, AES_256_4X_CBC_DESCRIPTOR,
    BLOCK_ALGORITHM_AES_256_4X_CBC
);
