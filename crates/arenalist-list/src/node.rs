//! Node storage: fixed-size records inside the pool's arena, each guarded
//! by its own mutex.
//!
//! # Layout
//!
//! Every node occupies exactly [`NODE_SIZE`] bytes, little-endian:
//!
//! ```text
//! [0..2)   data         u16
//! [2..4)   reserved     zero
//! [4..8)   stamp        u32, non-zero while live, zeroed on release
//! [8..12)  next stamp   u32, 0 means "no successor"
//! [12..16) next offset  u32
//! ```
//!
//! The pool behind a [`NodeStore`] only ever serves `NODE_SIZE` requests,
//! so every node starts at a multiple of `NODE_SIZE` and its offset maps
//! directly onto one entry of the lock table.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arenalist_pool::{Arena, ArenaId, BlockHandle, Pool, PoolConfig, PoolError};
use tracing::{debug, warn};

use crate::error::ListError;

/// Bytes occupied by one node in the arena.
pub const NODE_SIZE: usize = 16;

const DATA: usize = 0;
const RESERVED: usize = 2;
const STAMP: usize = 4;
const NEXT_STAMP: usize = 8;
const NEXT_OFFSET: usize = 12;

/// Reference to one node of a list.
///
/// A `NodeRef` is a plain value: holding one does not keep the node alive.
/// Once the node is deleted its stamp no longer matches and operations that
/// take a reference report [`ListError::NullReference`], even if the slot
/// has since been reused for a new node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef {
    arena: ArenaId,
    offset: u32,
    stamp: u32,
}

impl NodeRef {
    /// Byte offset of the node inside its arena.
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    /// Generation stamp assigned when the node was created.
    pub fn stamp(&self) -> u32 {
        self.stamp
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node({}, off={}, stamp={})",
            self.arena, self.offset, self.stamp
        )
    }
}

/// Owner of a list's pool and of one mutex per node slot.
pub(crate) struct NodeStore {
    pool: Pool,
    arena: Arc<Arena>,
    locks: Box<[Mutex<()>]>,
    stamps: AtomicU32,
}

impl NodeStore {
    /// Initialise a pool for `config` and the lock table covering it.
    pub(crate) fn new(config: PoolConfig) -> Result<Self, ListError> {
        let capacity = config.capacity;
        // Zero is left to the pool; a capacity below one node initialises
        // fine and the first insert reports the shortage.
        if capacity > u32::MAX as usize {
            return Err(ListError::InvalidCapacity { capacity });
        }
        let pool = Pool::new();
        pool.init_with(config).map_err(|e| match e {
            PoolError::InvalidCapacity { capacity } => ListError::InvalidCapacity { capacity },
            other => ListError::Pool(other),
        })?;
        let arena = pool.arena()?;
        let locks = (0..capacity / NODE_SIZE).map(|_| Mutex::new(())).collect();
        Ok(Self {
            pool,
            arena,
            locks,
            stamps: AtomicU32::new(1),
        })
    }

    pub(crate) fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Maximum number of nodes the arena can hold at once.
    pub(crate) fn slots(&self) -> usize {
        self.locks.len()
    }

    fn fresh_stamp(&self) -> u32 {
        loop {
            let stamp = self.stamps.fetch_add(1, Ordering::Relaxed);
            if stamp != 0 {
                return stamp;
            }
        }
    }

    fn slot(&self, offset: usize) -> Option<&Mutex<()>> {
        if offset % NODE_SIZE != 0 {
            return None;
        }
        self.locks.get(offset / NODE_SIZE)
    }

    fn acquire(slot: &Mutex<()>) -> MutexGuard<'_, ()> {
        // The guarded bytes live in the arena, not in the mutex, and every
        // write sequence under it is a handful of infallible stores.
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate and initialise a node that is not yet linked anywhere.
    pub(crate) fn create(&self, data: u16, next: Option<NodeRef>) -> Result<NodeRef, ListError> {
        let handle = self
            .pool
            .allocate(NODE_SIZE)
            .map_err(ListError::AllocationFailed)?;
        let node = NodeRef {
            arena: self.arena.id(),
            // Capacity is capped at u32::MAX, so every offset fits.
            offset: handle.offset() as u32,
            stamp: self.fresh_stamp(),
        };
        let mut guard = self.lock(node);
        guard.write_header(data);
        guard.set_next(next);
        drop(guard);
        Ok(node)
    }

    /// Lock a node reached by following links.
    ///
    /// Links only ever point at live nodes, so the stamp is trusted.
    pub(crate) fn lock(&self, node: NodeRef) -> NodeGuard<'_> {
        // Offsets handed out by this store's pool always map to a slot.
        let slot = &self.locks[node.offset() / NODE_SIZE];
        NodeGuard {
            store: self,
            node,
            _lock: Self::acquire(slot),
        }
    }

    /// Lock a node named by a caller-supplied reference, checking that it
    /// still refers to a live node of this store.
    pub(crate) fn lock_live(&self, node: NodeRef) -> Result<NodeGuard<'_>, ListError> {
        if node.arena != self.arena.id() {
            return Err(ListError::NullReference);
        }
        let slot = self.slot(node.offset()).ok_or(ListError::NullReference)?;
        let guard = NodeGuard {
            store: self,
            node,
            _lock: Self::acquire(slot),
        };
        if guard.stamp() != node.stamp {
            debug!(%node, "stale node reference");
            return Err(ListError::NullReference);
        }
        Ok(guard)
    }

    /// Retire a locked node and return its storage to the pool.
    ///
    /// The stamp is cleared while the lock is still held, so anyone queued
    /// on the same slot with the old reference sees it as stale.
    pub(crate) fn release(&self, guard: NodeGuard<'_>) {
        let node = guard.node;
        guard.retire();
        drop(guard);
        let handle = BlockHandle::new(node.arena, node.offset(), NODE_SIZE);
        match self.pool.free(handle) {
            Ok(()) => {}
            // The list was torn down in between; the arena is gone anyway.
            Err(PoolError::Uninitialized) => debug!(%node, "node freed after teardown"),
            Err(e) => warn!(%node, error = %e, "node storage could not be freed"),
        }
    }

    /// Release a node that was created but never linked.
    pub(crate) fn discard(&self, node: NodeRef) {
        let guard = self.lock(node);
        self.release(guard);
    }

    /// Tear down the pool. Outstanding references become stale.
    pub(crate) fn teardown(&self) {
        self.pool.deinit();
    }
}

impl fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("arena", &self.arena.id())
            .field("slots", &self.locks.len())
            .field("pool", &self.pool)
            .finish()
    }
}

/// Exclusive access to one node's fields.
///
/// Hand-over-hand traversal acquires the successor's guard before the
/// current one is dropped.
pub(crate) struct NodeGuard<'a> {
    store: &'a NodeStore,
    node: NodeRef,
    _lock: MutexGuard<'a, ()>,
}

impl NodeGuard<'_> {
    fn base(&self) -> usize {
        self.node.offset()
    }

    pub(crate) fn node(&self) -> NodeRef {
        self.node
    }

    pub(crate) fn data(&self) -> u16 {
        self.store.arena.load_u16(self.base() + DATA)
    }

    fn stamp(&self) -> u32 {
        self.store.arena.load_u32(self.base() + STAMP)
    }

    pub(crate) fn next(&self) -> Option<NodeRef> {
        let arena = &self.store.arena;
        let stamp = arena.load_u32(self.base() + NEXT_STAMP);
        if stamp == 0 {
            return None;
        }
        Some(NodeRef {
            arena: arena.id(),
            offset: arena.load_u32(self.base() + NEXT_OFFSET),
            stamp,
        })
    }

    pub(crate) fn set_next(&mut self, next: Option<NodeRef>) {
        let arena = &self.store.arena;
        let (stamp, offset) = next.map_or((0, 0), |n| (n.stamp, n.offset));
        arena.store_u32(self.base() + NEXT_STAMP, stamp);
        arena.store_u32(self.base() + NEXT_OFFSET, offset);
    }

    fn write_header(&mut self, data: u16) {
        let arena = &self.store.arena;
        arena.store_u16(self.base() + DATA, data);
        arena.store_u16(self.base() + RESERVED, 0);
        arena.store_u32(self.base() + STAMP, self.node.stamp);
    }

    fn retire(&self) {
        for word in (0..NODE_SIZE).step_by(4) {
            self.store.arena.store_u32(self.base() + word, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize) -> NodeStore {
        NodeStore::new(PoolConfig::new(capacity)).unwrap()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = NodeStore::new(PoolConfig::new(0)).unwrap_err();
        assert_eq!(err, ListError::InvalidCapacity { capacity: 0 });
    }

    #[test]
    fn capacity_below_one_node_fails_on_first_create() {
        for capacity in [1, NODE_SIZE - 1] {
            let s = store(capacity);
            assert_eq!(s.slots(), 0);
            assert!(matches!(
                s.create(1, None),
                Err(ListError::AllocationFailed(
                    PoolError::InsufficientCapacity { .. }
                ))
            ));
        }
    }

    #[test]
    fn lock_table_covers_every_slot() {
        assert_eq!(store(64).slots(), 4);
        assert_eq!(store(70).slots(), 4);
    }

    #[test]
    fn created_node_reads_back() {
        let s = store(64);
        let a = s.create(7, None).unwrap();
        let b = s.create(9, Some(a)).unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(b.offset(), NODE_SIZE);
        assert_ne!(a.stamp(), 0);

        let g = s.lock_live(b).unwrap();
        assert_eq!(g.data(), 9);
        assert_eq!(g.next(), Some(a));
        drop(g);
        assert_eq!(s.lock_live(a).unwrap().next(), None);
    }

    #[test]
    fn released_slot_reuse_keeps_old_ref_stale() {
        let s = store(32);
        let old = s.create(1, None).unwrap();
        s.discard(old);
        let new = s.create(2, None).unwrap();
        assert_eq!(new.offset(), old.offset());
        assert!(matches!(s.lock_live(old), Err(ListError::NullReference)));
        assert_eq!(s.lock_live(new).unwrap().data(), 2);
    }

    #[test]
    fn release_zeroes_every_word_of_the_node() {
        let s = store(32);
        let a = s.create(0xbeef, None).unwrap();
        let b = s.create(3, Some(a)).unwrap();
        s.discard(b);
        let base = b.offset();
        for word in (0..NODE_SIZE).step_by(4) {
            assert_eq!(s.arena.load_u32(base + word), 0, "word at {word}");
        }
        assert_eq!(s.lock_live(a).unwrap().data(), 0xbeef);
    }

    #[test]
    fn reference_from_another_store_is_rejected() {
        let a = store(32);
        let b = store(32);
        let node = a.create(5, None).unwrap();
        assert!(matches!(b.lock_live(node), Err(ListError::NullReference)));
    }

    #[test]
    fn full_store_reports_allocation_failure() {
        let s = store(32);
        s.create(1, None).unwrap();
        s.create(2, None).unwrap();
        let err = s.create(3, None).unwrap_err();
        assert!(matches!(
            err,
            ListError::AllocationFailed(PoolError::OutOfSpace { .. })
        ));
    }

    #[test]
    fn teardown_makes_allocation_fail() {
        let s = store(32);
        let node = s.create(1, None).unwrap();
        s.teardown();
        assert!(matches!(
            s.create(2, None),
            Err(ListError::AllocationFailed(PoolError::Uninitialized))
        ));
        // Releasing after teardown is tolerated.
        s.discard(node);
    }

    #[test]
    fn display_names_arena_and_slot() {
        let s = store(32);
        let node = s.create(1, None).unwrap();
        let text = node.to_string();
        assert!(text.starts_with("Node(arena#"));
        assert!(text.contains("off=0"));
    }
}
