//! PRNG family and the operating-system entropy source
//!
//! A PRNG context is an open handle to a cryptographic random source.
//! Reads either fill the requested region completely or fail; on failure
//! the destination is zeroed so a partial fill can never be mistaken for
//! entropy. Reads from the OS source may block while the kernel pool
//! reseeds.

use std::any::Any;
use std::sync::{Arc, Once};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};
use crate::registry::{self, Descriptor, Registration, INTERFACE_PRNG};

/// Selector for the operating-system CPRNG source.
pub const PRNG_SOURCE_OPERATING_SYSTEM: u32 = 0x0000_0100;

/// Size of a raw UUID in bytes.
pub const UUID_SIZE: usize = 16;

/// An open random source behind the family vtable.
pub trait PrngEngine: Send {
    /// Fill `out` completely with random bytes.
    fn read(&mut self, out: &mut [u8]) -> CryptoResult<()>;
}

/// Static descriptor for a PRNG source.
pub struct PrngDescriptor {
    /// Source selector.
    pub source: u32,
    /// Engine constructor invoked by context init (opens the source).
    pub(crate) new_engine:
        fn(&PrngOptions) -> CryptoResult<Box<dyn PrngEngine>>,
    /// Hook run once when the descriptor is cloned into live options.
    pub(crate) options_init:
        Option<fn(&mut PrngOptions) -> CryptoResult<()>>,
}

/// Live PRNG options: a descriptor bound to an allocator.
#[derive(Clone)]
pub struct PrngOptions {
    descriptor: &'static PrngDescriptor,
    alloc: SharedAllocator,
    implementation: Option<Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for PrngOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrngOptions").finish_non_exhaustive()
    }
}

impl PrngOptions {
    /// Resolve `source` in the registry and bind it to `alloc`.
    pub fn init(alloc: &SharedAllocator, source: u32) -> CryptoResult<Self> {
        let reg = registry::find(INTERFACE_PRNG, source)
            .ok_or(CryptoError::PrngOptionsInitMissingImpl)?;
        let Descriptor::Prng(descriptor) = reg.descriptor else {
            return Err(CryptoError::PrngOptionsInitMissingImpl);
        };

        let mut options = PrngOptions {
            descriptor,
            alloc: Arc::clone(alloc),
            implementation: None,
        };
        if let Some(hook) = descriptor.options_init {
            hook(&mut options)?;
        }
        Ok(options)
    }

    /// The source selector these options were resolved from.
    pub fn source(&self) -> u32 {
        self.descriptor.source
    }

    /// The allocator bound to these options.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// Open the random source.
    pub fn create_prng(&self) -> CryptoResult<PrngContext> {
        let engine = (self.descriptor.new_engine)(self)?;
        Ok(PrngContext { options: self.clone(), engine })
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

/// An open handle to a random source.
pub struct PrngContext {
    options: PrngOptions,
    engine: Box<dyn PrngEngine>,
}

impl std::fmt::Debug for PrngContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrngContext").finish_non_exhaustive()
    }
}

impl PrngContext {
    /// The options this context was created from.
    pub fn options(&self) -> &PrngOptions {
        &self.options
    }

    /// Read `length` random bytes into the head of `buffer`.
    pub fn read(
        &mut self,
        buffer: &mut Buffer,
        length: usize,
    ) -> CryptoResult<()> {
        if length > buffer.size() {
            return Err(CryptoError::PrngReadWouldOverwrite);
        }
        self.read_bytes(&mut buffer.as_mut_slice()[..length])
    }

    /// Read random bytes into a raw region.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> CryptoResult<()> {
        if let Err(err) = self.engine.read(out) {
            out.fill(0);
            // Preserve injected mock statuses; real underreads collapse to
            // the family read-failure code.
            return Err(match err {
                CryptoError::MockNotAdded => err,
                _ => CryptoError::PrngReadFailure,
            });
        }
        Ok(())
    }

    /// Fill `uuid` with 16 raw random bytes. No version or variant bits
    /// are set.
    pub fn read_uuid(&mut self, uuid: &mut Buffer) -> CryptoResult<()> {
        if uuid.size() != UUID_SIZE {
            return Err(CryptoError::PrngReadWouldOverwrite);
        }
        self.read(uuid, UUID_SIZE)
    }
}

// ------------------------------ OS source ------------------------------

struct OsPrngEngine;

impl PrngEngine for OsPrngEngine {
    fn read(&mut self, out: &mut [u8]) -> CryptoResult<()> {
        OsRng
            .try_fill_bytes(out)
            .map_err(|_| CryptoError::PrngReadFailure)
    }
}

fn new_os_engine(
    _options: &PrngOptions,
) -> CryptoResult<Box<dyn PrngEngine>> {
    Ok(Box::new(OsPrngEngine))
}

static OS_DESCRIPTOR: PrngDescriptor = PrngDescriptor {
    source: PRNG_SOURCE_OPERATING_SYSTEM,
    new_engine: new_os_engine,
    options_init: None,
};

/// Register the operating-system CPRNG source. Idempotent.
pub fn register_source_operating_system() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        registry::register(Registration {
            interface: INTERFACE_PRNG,
            implementation: PRNG_SOURCE_OPERATING_SYSTEM,
            features: PRNG_SOURCE_OPERATING_SYSTEM,
            descriptor: Descriptor::Prng(&OS_DESCRIPTOR),
        });
    });
}
