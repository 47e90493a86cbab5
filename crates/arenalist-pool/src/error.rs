//! Pool-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during pool operations.
///
/// None of these are fatal: every variant is reported to the caller and
/// leaves the pool's registry exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// `init` was called with a capacity of zero.
    InvalidCapacity {
        /// The rejected capacity in bytes.
        capacity: usize,
    },
    /// `init` was called on a pool whose arena is still live.
    AlreadyInitialized,
    /// The backing storage for the arena could not be reserved.
    ArenaUnavailable {
        /// The capacity that could not be reserved, in bytes.
        capacity: usize,
    },
    /// The pool has not been initialised, or has been torn down.
    Uninitialized,
    /// A zero-byte allocation or resize was requested.
    InvalidSize,
    /// The request is larger than the whole arena, even when empty.
    InsufficientCapacity {
        /// Number of bytes requested.
        requested: usize,
        /// Total arena capacity in bytes.
        capacity: usize,
    },
    /// No gap in the arena is large enough for the request.
    OutOfSpace {
        /// Number of bytes requested.
        requested: usize,
        /// Largest free gap at the time of the request.
        largest_gap: usize,
    },
    /// The handle does not name a live block in this pool's arena.
    InvalidHandle {
        /// Offset carried by the rejected handle.
        offset: usize,
    },
    /// A read or write would run past the end of a live block.
    OutOfBounds {
        /// Offset of the block within the arena.
        block: usize,
        /// End of the attempted access, relative to the block start.
        end: usize,
        /// Current length of the block.
        len: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity { capacity } => {
                write!(f, "invalid pool capacity: {capacity} bytes")
            }
            Self::AlreadyInitialized => write!(f, "pool is already initialised"),
            Self::ArenaUnavailable { capacity } => {
                write!(f, "could not reserve {capacity} bytes for the arena")
            }
            Self::Uninitialized => write!(f, "pool is not initialised"),
            Self::InvalidSize => write!(f, "block size must be at least 1 byte"),
            Self::InsufficientCapacity {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "request of {requested} bytes exceeds pool capacity of {capacity} bytes"
                )
            }
            Self::OutOfSpace {
                requested,
                largest_gap,
            } => {
                write!(
                    f,
                    "no gap fits {requested} bytes (largest gap {largest_gap} bytes)"
                )
            }
            Self::InvalidHandle { offset } => {
                write!(f, "no live block at offset {offset}")
            }
            Self::OutOfBounds { block, end, len } => {
                write!(
                    f,
                    "access to byte {end} of block at offset {block} exceeds its length {len}"
                )
            }
        }
    }
}

impl Error for PoolError {}
