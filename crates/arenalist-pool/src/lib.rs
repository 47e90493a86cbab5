//! Fixed-capacity first-fit arena allocation for arenalist.
//!
//! A [`Pool`] reserves one contiguous byte [`Arena`] at `init` and carves it
//! into blocks on request. Only allocated ranges are recorded, in an
//! address-ordered [`BlockRegistry`]; free space is the set of gaps between
//! them and is found by scanning at allocation time.
//!
//! # Architecture
//!
//! ```text
//! Pool (one mutex around everything below)
//! ├── Arena          (Box<[AtomicU8]>, reserved once, released once)
//! └── BlockRegistry  (sorted BlockDescriptor { start, len })
//! ```
//!
//! # Placement
//!
//! Requests are placed at the first gap, in address order, that fits:
//! before the first block, between two blocks, or after the last. Freed
//! blocks are not merged with anything; their range simply becomes part of
//! a gap again.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod handle;
pub mod pool;
pub mod registry;

// Public re-exports for the primary API surface.
pub use arena::{Arena, ArenaId};
pub use config::PoolConfig;
pub use error::PoolError;
pub use handle::BlockHandle;
pub use pool::{Pool, PoolStats};
pub use registry::{BlockDescriptor, BlockRegistry};
