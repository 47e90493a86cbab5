//! Block handles returned by the pool.
//!
//! A [`BlockHandle`] names one allocated range of an arena. It is a plain
//! value: copying it does not duplicate ownership, and the pool validates
//! it on every use by looking up the descriptor that starts at its offset.

use std::fmt;

use crate::arena::ArenaId;

/// Location of an allocated block within a pool's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct BlockHandle {
    /// Arena lifetime this block was carved from.
    pub(crate) arena: ArenaId,
    /// Byte offset of the block within the arena.
    pub(crate) offset: usize,
    /// Length of the block in bytes when the handle was issued.
    pub(crate) len: usize,
}

impl BlockHandle {
    /// Create a handle.
    ///
    /// Constructing a handle does not allocate anything; the pool rejects
    /// handles that do not match a live block with `InvalidHandle`.
    pub fn new(arena: ArenaId, offset: usize, len: usize) -> Self {
        Self { arena, offset, len }
    }

    /// The arena this handle belongs to.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// Byte offset of the block within the arena.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Block length in bytes at the time the handle was issued.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this handle describes a zero-length block.
    ///
    /// The pool never issues these.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockHandle({}, off={}, len={})",
            self.arena, self.offset, self.len
        )
    }
}
