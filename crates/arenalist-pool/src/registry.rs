//! Address-ordered registry of allocated blocks.
//!
//! The [`BlockRegistry`] records only *allocated* ranges. Free space is never
//! stored: a gap is whatever lies between two neighbouring descriptors, before
//! the first one, or after the last one, and is rediscovered on each
//! allocation by a single ordered scan. Freeing therefore only removes a
//! descriptor; there is nothing to merge.

/// One allocated range of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockDescriptor {
    /// Offset of the first byte.
    pub start: usize,
    /// Length in bytes. Never zero.
    pub len: usize,
}

impl BlockDescriptor {
    /// One past the last byte of the block.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Sorted, non-overlapping set of [`BlockDescriptor`]s.
///
/// Invariant: for neighbours `a`, `b` in iteration order,
/// `a.end() <= b.start`. Every mutator preserves it; callers supply
/// positions obtained from [`find_gap`](Self::find_gap) or
/// [`position`](Self::position).
#[derive(Clone, Debug, Default)]
pub struct BlockRegistry {
    blocks: Vec<BlockDescriptor>,
}

impl BlockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// First-fit search for `size` bytes in an arena of `capacity` bytes.
    ///
    /// Candidates are tried in address order:
    ///
    /// 1. an empty registry places the block at offset 0;
    /// 2. the gap before the first block;
    /// 3. the first gap between two neighbouring blocks that fits;
    /// 4. the gap between the last block and the end of the arena.
    ///
    /// Returns `(index, offset)`: the position at which the new descriptor
    /// must be inserted to keep the registry sorted, and its start offset.
    pub fn find_gap(&self, size: usize, capacity: usize) -> Option<(usize, usize)> {
        if size == 0 || size > capacity {
            return None;
        }
        let mut cursor = 0;
        for (index, block) in self.blocks.iter().enumerate() {
            if block.start - cursor >= size {
                return Some((index, cursor));
            }
            cursor = block.end();
        }
        if capacity - cursor >= size {
            return Some((self.blocks.len(), cursor));
        }
        None
    }

    /// Insert a descriptor at a position returned by [`find_gap`](Self::find_gap).
    pub(crate) fn insert_at(&mut self, index: usize, block: BlockDescriptor) {
        debug_assert!(index == 0 || self.blocks[index - 1].end() <= block.start);
        debug_assert!(index == self.blocks.len() || block.end() <= self.blocks[index].start);
        self.blocks.insert(index, block);
    }

    /// Insert a descriptor at its sorted position.
    ///
    /// Used to reinstate a block that was taken out temporarily; the caller
    /// guarantees the range is still free.
    pub(crate) fn insert(&mut self, block: BlockDescriptor) -> usize {
        let index = self.blocks.partition_point(|b| b.start < block.start);
        self.insert_at(index, block);
        index
    }

    /// Index of the descriptor starting exactly at `start`, if any.
    pub fn position(&self, start: usize) -> Option<usize> {
        self.blocks.binary_search_by_key(&start, |b| b.start).ok()
    }

    /// The descriptor at `index`.
    pub fn get(&self, index: usize) -> Option<&BlockDescriptor> {
        self.blocks.get(index)
    }

    /// Change the length of the descriptor at `index`.
    ///
    /// The caller has checked that the new end does not reach the next block.
    pub(crate) fn set_len(&mut self, index: usize, len: usize) {
        self.blocks[index].len = len;
        debug_assert!(
            index + 1 == self.blocks.len() || self.blocks[index].end() <= self.blocks[index + 1].start
        );
    }

    /// Remove and return the descriptor at `index`.
    pub(crate) fn remove(&mut self, index: usize) -> BlockDescriptor {
        self.blocks.remove(index)
    }

    /// Free bytes directly after the block at `index`, up to the next block
    /// or the end of the arena.
    pub fn gap_after(&self, index: usize, capacity: usize) -> usize {
        let end = self.blocks[index].end();
        let limit = self
            .blocks
            .get(index + 1)
            .map_or(capacity, |next| next.start);
        limit - end
    }

    /// Size of the largest gap in an arena of `capacity` bytes.
    pub fn largest_gap(&self, capacity: usize) -> usize {
        let mut cursor = 0;
        let mut largest = 0;
        for block in &self.blocks {
            largest = largest.max(block.start - cursor);
            cursor = block.end();
        }
        largest.max(capacity - cursor)
    }

    /// Sum of all live block lengths.
    pub fn used_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.len).sum()
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no blocks are live.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over live blocks in address order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.blocks.iter()
    }

    /// Drop every descriptor.
    pub(crate) fn clear(&mut self) {
        self.blocks.clear();
    }
}
