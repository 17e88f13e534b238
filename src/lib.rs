//! Crate root: pluggable cryptographic primitives behind crypto suites
//!
//! This library is a uniform, capability-indirected surface over families
//! of cryptographic primitives: hash, MAC, CPRNG, block cipher, stream
//! cipher, digital signature, key agreement, key derivation, and the
//! crypto-aware byte buffer they all traffic in. Callers speak to the
//! abstract per-family interfaces; a named **crypto suite** pins one
//! concrete algorithm per family (the [`suite::SUITE_VELO_V1`] suite pins
//! SHA-512, Ed25519, X25519, AES-256 and friends).
//!
//! ## Composition model
//!
//! - **Registry.** Every algorithm is published once at startup into a
//!   process-wide table keyed by `(interface tag, selector)`; see
//!   [`registry`]. The `register_*` functions are idempotent and resolve
//!   their own dependencies. Registration happens-before use; the table
//!   is append-only within a run.
//! - **Options.** Resolving a selector yields a live options object: the
//!   static descriptor (sizes plus engine constructor) bound to a shared
//!   allocator. Options are cheap to clone and effectively immutable
//!   after construction, so distinct contexts built from one options
//!   object may run on different threads.
//! - **Contexts.** Options construct per-operation contexts. Contexts
//!   are strictly linear: not cloneable, not reusable after finalize, and
//!   not to be shared while an operation is outstanding.
//! - **Disposal.** Buffers and library-owned intermediates overwrite
//!   their bytes with zero on drop. Status codes are wire-stable 16-bit
//!   numbers; see [`error::CryptoError::code`].
//!
//! ## Example
//!
//! ```
//! use velocrypt::alloc::system_allocator;
//! use velocrypt::suite::{self, SuiteOptions, SUITE_VELO_V1};
//!
//! suite::register_velo_v1();
//! let alloc = system_allocator();
//! let opts = SuiteOptions::init(&alloc, SUITE_VELO_V1)?;
//!
//! let mut signer = opts.digital_signature_init()?;
//! let mut private = opts.buffer_for_signature_private_key()?;
//! let mut public = opts.buffer_for_signature_public_key()?;
//! signer.keypair_create(&mut private, &mut public)?;
//!
//! let mut signature = opts.buffer_for_signature()?;
//! signer.sign(&mut signature, &private, b"a signed statement")?;
//! signer.verify(&signature, &public, b"a signed statement")?;
//! # Ok::<(), velocrypt::error::CryptoError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

pub mod alloc;
pub mod buffer;
pub mod error;
pub mod padding;
pub mod registry;

pub mod agreement;
pub mod block;
pub mod hash;
pub mod kdf;
pub mod mac;
pub mod prng;
pub mod sign;
pub mod stream;

pub mod mock;
pub mod suite;

pub use crate::alloc::{Allocator, SharedAllocator, SystemAllocator};
pub use crate::buffer::Buffer;
pub use crate::error::{CryptoError, CryptoResult};
