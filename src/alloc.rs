//! Allocator capability and the disposal contract
//!
//! Every construct in this crate acquires storage through a shared
//! [`Allocator`] handle rather than the global allocator directly. This
//! keeps allocation failure an ordinary, testable error
//! ([`CryptoError::BufferInitOutOfMemory`]) and gives tests a seam for
//! injecting failures when exercising init rollback paths.
//!
//! Disposal is the Rust drop path: any object holding secret material
//! overwrites its owned bytes with zero (via `zeroize`) before the storage
//! is released. Drop runs exactly once, so disposal is idempotent by
//! construction.

use std::sync::Arc;

use crate::error::{CryptoError, CryptoResult};

/// A pluggable source of byte storage.
///
/// `allocate` returns zero-initialized storage or
/// [`CryptoError::BufferInitOutOfMemory`]; it must never panic. Release
/// happens when the returned vector is dropped.
pub trait Allocator: Send + Sync {
    /// Allocate `size` zeroed bytes.
    fn allocate(&self, size: usize) -> CryptoResult<Vec<u8>>;
}

/// Shared allocator handle carried by reference through every construct.
pub type SharedAllocator = Arc<dyn Allocator>;

/// Allocator backed by the process heap, using fallible reservation so an
/// out-of-memory condition surfaces as an error instead of an abort.
#[derive(Debug, Default)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, size: usize) -> CryptoResult<Vec<u8>> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| CryptoError::BufferInitOutOfMemory)?;
        data.resize(size, 0);
        Ok(data)
    }
}

/// Construct a shared handle to the system allocator.
pub fn system_allocator() -> SharedAllocator {
    Arc::new(SystemAllocator)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Allocator that fails every allocation once `remaining` successful
    /// allocations have been handed out. Used to drive init rollback paths.
    pub(crate) struct FailingAllocator {
        remaining: AtomicUsize,
    }

    impl FailingAllocator {
        pub(crate) fn after(successes: usize) -> SharedAllocator {
            Arc::new(FailingAllocator {
                remaining: AtomicUsize::new(successes),
            })
        }
    }

    impl Allocator for FailingAllocator {
        fn allocate(&self, size: usize) -> CryptoResult<Vec<u8>> {
            let mut cur = self.remaining.load(Ordering::SeqCst);
            loop {
                if cur == 0 {
                    return Err(CryptoError::BufferInitOutOfMemory);
                }
                match self.remaining.compare_exchange(
                    cur,
                    cur - 1,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                ) {
                    Ok(_) => break,
                    Err(actual) => cur = actual,
                }
            }
            SystemAllocator.allocate(size)
        }
    }
}
