//! List-specific error types.

use std::error::Error;
use std::fmt;

use arenalist_pool::PoolError;

/// Errors from list operations.
///
/// Every failing operation leaves the list exactly as it found it: no
/// partially linked node, no lock left held.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListError {
    /// The requested capacity cannot hold a list: zero, smaller than one
    /// node, or too large for 32-bit node offsets.
    InvalidCapacity {
        /// The rejected capacity in bytes.
        capacity: usize,
    },
    /// The backing pool could not be set up or queried.
    Pool(PoolError),
    /// Storage for a new node could not be allocated.
    AllocationFailed(PoolError),
    /// A node reference was absent or no longer names a live node.
    NullReference,
    /// No node carries the requested value, or the reference node is not
    /// reachable from the head.
    NotFound,
    /// The list has no nodes.
    EmptyList,
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity { capacity } => {
                write!(f, "invalid list capacity: {capacity} bytes")
            }
            Self::Pool(e) => write!(f, "pool: {e}"),
            Self::AllocationFailed(e) => write!(f, "node allocation failed: {e}"),
            Self::NullReference => write!(f, "node reference is null or stale"),
            Self::NotFound => write!(f, "node not found"),
            Self::EmptyList => write!(f, "list is empty"),
        }
    }
}

impl Error for ListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) | Self::AllocationFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for ListError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_failure_chains_pool_error() {
        let e = ListError::AllocationFailed(PoolError::OutOfSpace {
            requested: 16,
            largest_gap: 0,
        });
        assert!(e.to_string().starts_with("node allocation failed"));
        assert!(e.source().is_some());
    }

    #[test]
    fn expected_misses_have_no_source() {
        assert!(ListError::NotFound.source().is_none());
        assert!(ListError::EmptyList.source().is_none());
    }
}
