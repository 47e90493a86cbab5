//! The contiguous byte region backing a pool.
//!
//! An [`Arena`] is reserved once by [`Pool::init`](crate::Pool::init) and
//! dropped once by [`Pool::deinit`](crate::Pool::deinit). Its bytes are
//! `AtomicU8` cells so that owners of disjoint blocks can read and write
//! their ranges without taking the pool mutex; any ordering between
//! accesses to the *same* block is the owner's responsibility (list nodes
//! use their per-node mutex for this).

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::error::PoolError;

/// Process-unique identity of one arena lifetime.
///
/// Every successful `init` mints a fresh id, so a handle from a torn-down
/// arena is rejected by a re-initialised pool even if offsets line up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(pub u64);

impl ArenaId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arena#{}", self.0)
    }
}

/// A fixed-size, zero-initialised byte region.
pub struct Arena {
    id: ArenaId,
    bytes: Box<[AtomicU8]>,
}

// Compile-time assertion: Arena must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Arena>();
};

impl Arena {
    /// Reserve `capacity` zeroed bytes.
    ///
    /// The reservation is fallible: if the system cannot provide the
    /// storage, `ArenaUnavailable` is returned instead of aborting.
    pub(crate) fn try_new(capacity: usize) -> Result<Self, PoolError> {
        let mut bytes: Vec<AtomicU8> = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| PoolError::ArenaUnavailable { capacity })?;
        bytes.extend((0..capacity).map(|_| AtomicU8::new(0)));
        Ok(Self {
            id: ArenaId::next(),
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// The identity of this arena.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Copy `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + buf.len()` exceeds the arena capacity.
    pub(crate) fn load(&self, offset: usize, buf: &mut [u8]) {
        let src = &self.bytes[offset..offset + buf.len()];
        for (dst, cell) in buf.iter_mut().zip(src) {
            *dst = cell.load(Ordering::Relaxed);
        }
    }

    /// Copy `src` into the arena starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + src.len()` exceeds the arena capacity.
    pub(crate) fn store(&self, offset: usize, src: &[u8]) {
        let dst = &self.bytes[offset..offset + src.len()];
        for (cell, &byte) in dst.iter().zip(src) {
            cell.store(byte, Ordering::Relaxed);
        }
    }

    /// Set `len` bytes starting at `offset` to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds the arena capacity.
    pub(crate) fn fill(&self, offset: usize, len: usize, value: u8) {
        for cell in &self.bytes[offset..offset + len] {
            cell.store(value, Ordering::Relaxed);
        }
    }

    /// Read a little-endian `u16` at `offset`.
    pub fn load_u16(&self, offset: usize) -> u16 {
        let mut buf = [0u8; 2];
        self.load(offset, &mut buf);
        u16::from_le_bytes(buf)
    }

    /// Write a little-endian `u16` at `offset`.
    pub fn store_u16(&self, offset: usize, value: u16) {
        self.store(offset, &value.to_le_bytes());
    }

    /// Read a little-endian `u32` at `offset`.
    pub fn load_u32(&self, offset: usize) -> u32 {
        let mut buf = [0u8; 4];
        self.load(offset, &mut buf);
        u32::from_le_bytes(buf)
    }

    /// Write a little-endian `u32` at `offset`.
    pub fn store_u32(&self, offset: usize, value: u32) {
        self.store(offset, &value.to_le_bytes());
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .finish()
    }
}
