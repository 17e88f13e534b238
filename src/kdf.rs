//! Key derivation family: PBKDF2 over the pluggable HMAC
//!
//! PBKDF2 (RFC 2898 §5.2) with this crate's generic HMAC as the PRF. The
//! options pair a key derivation algorithm with an HMAC selector; the
//! derived key length is whatever the caller's output buffer holds, and
//! the round count trades derivation cost against brute-force cost.

use std::any::Any;
use std::sync::{Arc, Once};

use zeroize::Zeroize;

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::mac::MacOptions;
use crate::registry::{
    self, Descriptor, Registration, INTERFACE_KEY_DERIVATION,
};

/// Selector for PBKDF2.
pub const KEY_DERIVATION_ALGORITHM_PBKDF2: u32 = 0x0001_0000;

/// A key derivation algorithm instance behind the family vtable.
pub trait KeyDerivationEngine: Send {
    /// Derive `out.size()` bytes from a password and salt.
    fn derive_key(
        &mut self,
        out: &mut Buffer,
        password: &Buffer,
        salt: &Buffer,
        rounds: u32,
    ) -> CryptoResult<()>;
}

/// Static descriptor for a key derivation implementation.
pub struct KeyDerivationDescriptor {
    /// Algorithm selector.
    pub algorithm: u32,
    /// Engine constructor invoked by context init.
    pub(crate) new_engine:
        fn(&KeyDerivationOptions) -> CryptoResult<Box<dyn KeyDerivationEngine>>,
    /// Hook run once when the descriptor is cloned into live options.
    pub(crate) options_init:
        Option<fn(&mut KeyDerivationOptions) -> CryptoResult<()>>,
}

/// Live key derivation options: a descriptor bound to an allocator and an
/// HMAC.
#[derive(Clone)]
pub struct KeyDerivationOptions {
    descriptor: &'static KeyDerivationDescriptor,
    alloc: SharedAllocator,
    hmac_options: MacOptions,
    implementation: Option<Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for KeyDerivationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDerivationOptions").finish_non_exhaustive()
    }
}

impl KeyDerivationOptions {
    /// Resolve `algorithm` and `hmac_algorithm` in the registry and bind
    /// them to `alloc`.
    pub fn init(
        alloc: &SharedAllocator,
        algorithm: u32,
        hmac_algorithm: u32,
    ) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_KEY_DERIVATION, algorithm)
            .ok_or(CryptoError::KeyDerivationOptionsInitMissingImpl)?;
        let Descriptor::KeyDerivation(descriptor) = reg.descriptor else {
            return Err(CryptoError::KeyDerivationOptionsInitMissingImpl);
        };

        let hmac_options = MacOptions::init(alloc, hmac_algorithm)
            .map_err(|_| {
                CryptoError::KeyDerivationOptionsInitMissingHmacImpl
            })?;

        let mut options = KeyDerivationOptions {
            descriptor,
            alloc: Arc::clone(alloc),
            hmac_options,
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

    /// The HMAC selector used as the PRF.
    pub fn hmac_algorithm(&self) -> u32 {
        self.hmac_options.algorithm()
    }

    /// The PRF digest length in bytes.
    pub fn hmac_digest_length(&self) -> usize {
        self.hmac_options.mac_size()
    }

    /// The allocator bound to these options.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// The HMAC options used as the PRF.
    pub fn hmac_options(&self) -> &MacOptions {
        &self.hmac_options
    }

    /// Begin a key derivation instance.
    pub fn create_key_derivation(
        &self,
    ) -> CryptoResult<KeyDerivationContext> {
        let engine = (self.descriptor.new_engine)(self)?;
        Ok(KeyDerivationContext { options: self.clone(), engine })
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

/// A key derivation instance.
pub struct KeyDerivationContext {
    options: KeyDerivationOptions,
    engine: Box<dyn KeyDerivationEngine>,
}

impl std::fmt::Debug for KeyDerivationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDerivationContext").finish_non_exhaustive()
    }
}

impl KeyDerivationContext {
    /// The options this context was created from.
    pub fn options(&self) -> &KeyDerivationOptions {
        &self.options
    }

    /// Derive `out.size()` bytes from `password` and `salt` using
    /// `rounds` PRF iterations per block.
    pub fn derive_key(
        &mut self,
        out: &mut Buffer,
        password: &Buffer,
        salt: &Buffer,
        rounds: u32,
    ) -> CryptoResult<()> {
        if out.is_empty() || password.is_empty() || rounds == 0 {
            return Err(CryptoError::KeyDerivationDeriveKeyInvalidArg);
        }
        self.engine.derive_key(out, password, salt, rounds)
    }
}

// ---------------------------- PBKDF2 engine ----------------------------

struct Pbkdf2Engine {
    options: KeyDerivationOptions,
}

impl Pbkdf2Engine {
    /// One HMAC invocation: `HMAC(password, parts...)`.
    fn prf(
        &self,
        password: &Buffer,
        parts: &[&[u8]],
    ) -> CryptoResult<Buffer> {
        let mac_options = self.options.hmac_options();
        let mut mac = mac_options.create_mac(password)?;
        for part in parts {
            mac.digest(part)?;
        }
        let mut out = mac_options.code_buffer()?;
        mac.finalize(&mut out)?;
        Ok(out)
    }
}

impl KeyDerivationEngine for Pbkdf2Engine {
    fn derive_key(
        &mut self,
        out: &mut Buffer,
        password: &Buffer,
        salt: &Buffer,
        rounds: u32,
    ) -> CryptoResult<()> {
        let h_len = self.options.hmac_digest_length();
        let mut written = 0usize;
        let mut block_index = 0u32;

        while written < out.size() {
            block_index = block_index
                .checked_add(1)
                .ok_or(CryptoError::KeyDerivationDeriveKeyInvalidArg)?;

            // U_1 = PRF(P, S || INT(i)); U_j = PRF(P, U_{j-1}).
            let mut u = self.prf(
                password,
                &[salt.as_slice(), &block_index.to_be_bytes()],
            )?;
            let mut t: Vec<u8> = u.as_slice().to_vec();
            for _ in 1..rounds {
                let next = self.prf(password, &[u.as_slice()])?;
                for (acc, byte) in t.iter_mut().zip(next.as_slice()) {
                    *acc ^= byte;
                }
                u = next;
            }

            let take = h_len.min(out.size() - written);
            out.as_mut_slice()[written..written + take]
                .copy_from_slice(&t[..take]);
            t.zeroize();
            written += take;
        }
        Ok(())
    }
}

fn new_pbkdf2_engine(
    options: &KeyDerivationOptions,
) -> CryptoResult<Box<dyn KeyDerivationEngine>> {
    Ok(Box::new(Pbkdf2Engine { options: options.clone() }))
}

static PBKDF2_DESCRIPTOR: KeyDerivationDescriptor = KeyDerivationDescriptor {
    algorithm: KEY_DERIVATION_ALGORITHM_PBKDF2,
    new_engine: new_pbkdf2_engine,
    options_init: None,
};

/// Register PBKDF2. Idempotent. The PRF HMAC must be registered
/// separately by whoever selects it.
pub fn register_pbkdf2() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_KEY_DERIVATION,
            implementation: KEY_DERIVATION_ALGORITHM_PBKDF2,
            features: KEY_DERIVATION_ALGORITHM_PBKDF2,
            descriptor: Descriptor::KeyDerivation(&PBKDF2_DESCRIPTOR),
        });
    });
}
