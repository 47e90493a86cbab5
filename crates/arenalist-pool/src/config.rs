//! Pool configuration parameters.

use crate::error::PoolError;

/// Configuration for a [`Pool`](crate::Pool).
///
/// Validated by [`Pool::init_with`](crate::Pool::init_with); all values are
/// fixed for the lifetime of the arena they create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Total arena size in bytes. Must be at least 1.
    pub capacity: usize,

    /// Zero every block before it is handed out.
    ///
    /// Default: `true`. Grown blocks also have their new tail zeroed.
    /// Disabling this skips the fill and returns whatever bytes the
    /// previous owner of the range left behind.
    pub zero_on_alloc: bool,
}

impl PoolConfig {
    /// Default for [`PoolConfig::zero_on_alloc`].
    pub const DEFAULT_ZERO_ON_ALLOC: bool = true;

    /// Create a config for an arena of `capacity` bytes with default options.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            zero_on_alloc: Self::DEFAULT_ZERO_ON_ALLOC,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}
