//! The lock-coupled concurrent list.
//!
//! Locks are always taken in one global order: the list mutex (which
//! guards the head pointer), then node mutexes from head towards tail,
//! then the pool mutex. Traversals move hand over hand: the successor's
//! lock is acquired before the current one is released, so a node can
//! never be unlinked from under a walker.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::{Mutex, MutexGuard, PoisonError};

use arenalist_pool::{BlockDescriptor, PoolConfig, PoolError, PoolStats};
use tracing::{debug, info};

use crate::error::ListError;
use crate::node::{NodeGuard, NodeRef, NodeStore};

/// A singly linked list of `u16` values whose nodes live in a private
/// fixed-capacity pool.
///
/// All operations take `&self`; share the list between threads with a
/// reference (for example from [`std::thread::scope`]) or an `Arc`.
pub struct ConcurrentList {
    store: NodeStore,
    head: Mutex<Option<NodeRef>>,
}

// Compile-time assertion: ConcurrentList must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ConcurrentList>();
};

impl ConcurrentList {
    /// Create an empty list backed by a pool of `capacity` bytes.
    ///
    /// # Errors
    ///
    /// - [`ListError::InvalidCapacity`] if `capacity` is zero or larger
    ///   than `u32::MAX`. A capacity below [`NODE_SIZE`](crate::NODE_SIZE)
    ///   is accepted; every insert then fails with
    ///   [`ListError::AllocationFailed`].
    /// - [`ListError::Pool`] if the arena cannot be reserved.
    pub fn init(capacity: usize) -> Result<Self, ListError> {
        Self::with_config(PoolConfig::new(capacity))
    }

    /// Create an empty list backed by a pool built from `config`.
    pub fn with_config(config: PoolConfig) -> Result<Self, ListError> {
        let store = NodeStore::new(config)?;
        info!(
            capacity = config.capacity,
            slots = store.slots(),
            "list initialised"
        );
        Ok(Self {
            store,
            head: Mutex::new(None),
        })
    }

    fn head_lock(&self) -> MutexGuard<'_, Option<NodeRef>> {
        // The head is a single Copy value; a panicking writer cannot leave
        // it half updated.
        self.head.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called with the list mutex held, after a node was allocated but
    /// before it is linked: a [`cleanup`](Self::cleanup) that ran in
    /// between has torn the pool down, so the node must not be published.
    fn ensure_live(&self, new: NodeRef) -> Result<(), ListError> {
        if self.store.pool().is_live() {
            return Ok(());
        }
        self.store.discard(new);
        Err(ListError::AllocationFailed(PoolError::Uninitialized))
    }

    /// Lock the first node, holding the list mutex only until that lock
    /// is acquired.
    fn lock_first(&self) -> Option<NodeGuard<'_>> {
        let head = self.head_lock();
        (*head).map(|first| self.store.lock(first))
    }

    /// Append `data` at the tail.
    ///
    /// The list mutex is held for the whole walk, so appends are
    /// serialised against each other and against head changes.
    ///
    /// # Errors
    ///
    /// [`ListError::AllocationFailed`] if the pool has no room for another
    /// node; the list is unchanged.
    pub fn insert(&self, data: u16) -> Result<NodeRef, ListError> {
        let node = self.store.create(data, None)?;
        let mut head = self.head_lock();
        self.ensure_live(node)?;
        match *head {
            None => *head = Some(node),
            Some(first) => {
                let mut current = self.store.lock(first);
                while let Some(next) = current.next() {
                    current = self.store.lock(next);
                }
                current.set_next(Some(node));
            }
        }
        debug!(data, %node, "appended node");
        Ok(node)
    }

    /// Insert `data` directly after `node`.
    ///
    /// Only `node` itself is locked; the list mutex is not taken.
    ///
    /// # Errors
    ///
    /// - [`ListError::NullReference`] if `node` is `None` or no longer live.
    /// - [`ListError::AllocationFailed`] if the pool is full.
    pub fn insert_after(&self, node: Option<NodeRef>, data: u16) -> Result<NodeRef, ListError> {
        let Some(prev) = node else {
            return Err(ListError::NullReference);
        };
        let new = self.store.create(data, None)?;
        let mut prev_guard = match self.store.lock_live(prev) {
            Ok(guard) => guard,
            Err(e) => {
                self.store.discard(new);
                return Err(e);
            }
        };
        // `new` is unreachable until the link below, so nobody else can
        // hold its lock.
        self.store.lock(new).set_next(prev_guard.next());
        prev_guard.set_next(Some(new));
        debug!(data, after = %prev, node = %new, "inserted node after");
        Ok(new)
    }

    /// Insert `data` directly before `node`.
    ///
    /// # Errors
    ///
    /// - [`ListError::NullReference`] if `node` is `None`.
    /// - [`ListError::NotFound`] if `node` is not reachable from the head
    ///   (including when it has been deleted).
    /// - [`ListError::AllocationFailed`] if the pool is full.
    pub fn insert_before(&self, node: Option<NodeRef>, data: u16) -> Result<NodeRef, ListError> {
        let Some(target) = node else {
            return Err(ListError::NullReference);
        };
        let new = self.store.create(data, Some(target))?;
        let mut head = self.head_lock();
        self.ensure_live(new)?;
        let Some(first) = *head else {
            drop(head);
            self.store.discard(new);
            debug!(before = %target, "insert_before on an empty list");
            return Err(ListError::NotFound);
        };
        if first == target {
            *head = Some(new);
            debug!(data, before = %target, node = %new, "inserted node at head");
            return Ok(new);
        }
        let mut current = self.store.lock(first);
        loop {
            match current.next() {
                Some(next) if next == target => {
                    current.set_next(Some(new));
                    debug!(data, before = %target, node = %new, "inserted node before");
                    return Ok(new);
                }
                Some(next) => current = self.store.lock(next),
                None => {
                    drop(current);
                    drop(head);
                    self.store.discard(new);
                    debug!(before = %target, "insert_before target not in list");
                    return Err(ListError::NotFound);
                }
            }
        }
    }

    /// Remove the first node, in head-to-tail order, whose value is `data`.
    ///
    /// # Errors
    ///
    /// [`ListError::NotFound`] if the list is empty or no node matches.
    pub fn delete(&self, data: u16) -> Result<(), ListError> {
        let mut head = self.head_lock();
        let Some(first) = *head else {
            debug!(data, "delete on an empty list");
            return Err(ListError::NotFound);
        };
        let mut prev: Option<NodeGuard<'_>> = None;
        let mut current = self.store.lock(first);
        while current.data() != data {
            let Some(next) = current.next() else {
                debug!(data, "delete found no match");
                return Err(ListError::NotFound);
            };
            let next_guard = self.store.lock(next);
            prev = Some(std::mem::replace(&mut current, next_guard));
        }
        let successor = current.next();
        match prev.as_mut() {
            Some(p) => p.set_next(successor),
            None => *head = successor,
        }
        drop(prev);
        drop(head);
        let node = current.node();
        self.store.release(current);
        debug!(data, %node, "deleted node");
        Ok(())
    }

    /// Find the first node whose value is `data`.
    ///
    /// The list mutex is released as soon as the head node is locked, so
    /// searches run concurrently with each other and with appends further
    /// down the list.
    ///
    /// # Errors
    ///
    /// - [`ListError::EmptyList`] if the list has no nodes.
    /// - [`ListError::NotFound`] if no node matches.
    pub fn search(&self, data: u16) -> Result<NodeRef, ListError> {
        let Some(mut current) = self.lock_first() else {
            return Err(ListError::EmptyList);
        };
        loop {
            if current.data() == data {
                return Ok(current.node());
            }
            match current.next() {
                Some(next) => current = self.store.lock(next),
                None => {
                    debug!(data, "search found no match");
                    return Err(ListError::NotFound);
                }
            }
        }
    }

    /// Lazily iterate values from `start` (or the head) up to and including
    /// `end` (or the tail).
    ///
    /// If `end` is not reached the iteration runs to the tail. A `start`
    /// that is no longer live yields an empty range.
    ///
    /// The returned [`Range`] holds the lock of the node it will yield
    /// next. Drop it before the same thread calls any other operation on
    /// this list, or that call can deadlock.
    pub fn display_range(&self, start: Option<NodeRef>, end: Option<NodeRef>) -> Range<'_> {
        let current = match start {
            Some(node) => {
                // Taken to order this walk behind any in-flight head change.
                let _head = self.head_lock();
                self.store.lock_live(node).ok()
            }
            None => self.lock_first(),
        };
        Range {
            store: &self.store,
            current,
            end,
        }
    }

    /// Render the values between `start` and `end` as `[a, b, c]`.
    pub fn render(&self, start: Option<NodeRef>, end: Option<NodeRef>) -> String {
        let values: Vec<String> = self
            .display_range(start, end)
            .map(|v| v.to_string())
            .collect();
        format!("[{}]", values.join(", "))
    }

    /// Snapshot every value from head to tail.
    pub fn values(&self) -> Vec<u16> {
        self.display_range(None, None).collect()
    }

    /// Number of nodes, counted by a hand-over-hand walk.
    pub fn count(&self) -> usize {
        self.display_range(None, None).count()
    }

    /// Value stored in `node`.
    ///
    /// # Errors
    ///
    /// [`ListError::NullReference`] if `node` is no longer live.
    pub fn get(&self, node: NodeRef) -> Result<u16, ListError> {
        self.store.lock_live(node).map(|guard| guard.data())
    }

    /// Reference to the first node, if any.
    pub fn head(&self) -> Option<NodeRef> {
        *self.head_lock()
    }

    /// Whether the list has no nodes.
    pub fn is_empty(&self) -> bool {
        self.head_lock().is_none()
    }

    /// Release every node and tear down the backing pool.
    ///
    /// Afterwards the list is empty, every outstanding [`NodeRef`] is
    /// stale, and inserts fail with [`ListError::AllocationFailed`].
    /// Calling it again is a no-op.
    pub fn cleanup(&self) {
        let mut head = self.head_lock();
        let mut current = head.take().map(|first| self.store.lock(first));
        let mut released = 0usize;
        while let Some(guard) = current.take() {
            current = guard.next().map(|next| self.store.lock(next));
            self.store.release(guard);
            released += 1;
        }
        self.store.teardown();
        drop(head);
        info!(released, "list cleaned up");
    }

    /// Occupancy of the backing pool.
    ///
    /// # Errors
    ///
    /// [`ListError::Pool`] after [`cleanup`](Self::cleanup).
    pub fn pool_stats(&self) -> Result<PoolStats, ListError> {
        Ok(self.store.pool().stats()?)
    }

    /// Snapshot of the backing pool's live blocks in address order.
    pub fn pool_blocks(&self) -> Vec<BlockDescriptor> {
        self.store.pool().blocks()
    }
}

impl fmt::Debug for ConcurrentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentList")
            .field("head", &self.head())
            .field("store", &self.store)
            .finish()
    }
}

/// Lazy hand-over-hand iterator returned by
/// [`ConcurrentList::display_range`].
pub struct Range<'a> {
    store: &'a NodeStore,
    current: Option<NodeGuard<'a>>,
    end: Option<NodeRef>,
}

impl Iterator for Range<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let guard = self.current.take()?;
        let value = guard.data();
        if self.end != Some(guard.node()) {
            self.current = guard.next().map(|next| self.store.lock(next));
        }
        Some(value)
    }
}

impl FusedIterator for Range<'_> {}

impl fmt::Debug for Range<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Range")
            .field("next", &self.current.as_ref().map(|g| g.node()))
            .field("end", &self.end)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NODE_SIZE;
    use arenalist_pool::PoolError;

    fn list_of(values: &[u16]) -> ConcurrentList {
        let list = ConcurrentList::init(NODE_SIZE * 16).unwrap();
        for &v in values {
            list.insert(v).unwrap();
        }
        list
    }

    #[test]
    fn inserts_append_in_order() {
        let list = ConcurrentList::init(64).unwrap();
        list.insert(1).unwrap();
        list.insert(2).unwrap();
        list.insert(3).unwrap();
        assert_eq!(list.render(None, None), "[1, 2, 3]");
        assert_eq!(list.count(), 3);
    }

    #[test]
    fn delete_unlinks_middle_node() {
        let list = list_of(&[1, 2, 3]);
        list.delete(2).unwrap();
        assert_eq!(list.values(), vec![1, 3]);
        assert_eq!(list.search(2), Err(ListError::NotFound));
    }

    #[test]
    fn delete_head_and_tail() {
        let list = list_of(&[1, 2, 3]);
        list.delete(1).unwrap();
        assert_eq!(list.values(), vec![2, 3]);
        list.delete(3).unwrap();
        assert_eq!(list.values(), vec![2]);
        list.delete(2).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.head(), None);
    }

    #[test]
    fn delete_removes_first_occurrence_only() {
        let list = ConcurrentList::init(64).unwrap();
        let first = list.insert(5).unwrap();
        list.insert(7).unwrap();
        let last = list.insert(5).unwrap();
        list.delete(5).unwrap();
        assert_eq!(list.values(), vec![7, 5]);
        assert_eq!(list.get(first), Err(ListError::NullReference));
        assert_eq!(list.get(last), Ok(5));
    }

    #[test]
    fn delete_misses_report_not_found() {
        let empty = ConcurrentList::init(64).unwrap();
        assert_eq!(empty.delete(1), Err(ListError::NotFound));
        let list = list_of(&[1, 2]);
        assert_eq!(list.delete(9), Err(ListError::NotFound));
        assert_eq!(list.values(), vec![1, 2]);
    }

    #[test]
    fn search_distinguishes_empty_from_missing() {
        let list = ConcurrentList::init(64).unwrap();
        assert_eq!(list.search(1), Err(ListError::EmptyList));
        let a = list.insert(1).unwrap();
        let b = list.insert(1).unwrap();
        assert_eq!(list.search(1), Ok(a));
        assert_ne!(a, b);
        assert_eq!(list.search(4), Err(ListError::NotFound));
    }

    #[test]
    fn insert_after_links_behind_reference() {
        let list = list_of(&[1, 3]);
        let one = list.search(1).unwrap();
        let two = list.insert_after(Some(one), 2).unwrap();
        assert_eq!(list.values(), vec![1, 2, 3]);
        let tail = list.search(3).unwrap();
        list.insert_after(Some(tail), 4).unwrap();
        assert_eq!(list.values(), vec![1, 2, 3, 4]);
        assert_eq!(list.get(two), Ok(2));
    }

    #[test]
    fn insert_after_rejects_null_and_stale() {
        let list = list_of(&[1, 2]);
        assert_eq!(list.insert_after(None, 9), Err(ListError::NullReference));
        let two = list.search(2).unwrap();
        list.delete(2).unwrap();
        assert_eq!(list.insert_after(Some(two), 9), Err(ListError::NullReference));
        assert_eq!(list.values(), vec![1]);
        // The speculative node was returned to the pool.
        assert_eq!(list.pool_stats().unwrap().live_blocks, 1);
    }

    #[test]
    fn insert_before_head_and_middle() {
        let list = list_of(&[2, 4]);
        let two = list.search(2).unwrap();
        let four = list.search(4).unwrap();
        let one = list.insert_before(Some(two), 1).unwrap();
        assert_eq!(list.head(), Some(one));
        list.insert_before(Some(four), 3).unwrap();
        assert_eq!(list.values(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn insert_before_unreachable_node() {
        let list = list_of(&[1, 2]);
        assert_eq!(list.insert_before(None, 0), Err(ListError::NullReference));
        let two = list.search(2).unwrap();
        list.delete(2).unwrap();
        assert_eq!(list.insert_before(Some(two), 0), Err(ListError::NotFound));
        assert_eq!(list.values(), vec![1]);
        assert_eq!(list.pool_stats().unwrap().live_blocks, 1);
    }

    #[test]
    fn full_pool_rejects_insert_without_changing_list() {
        let list = ConcurrentList::init(NODE_SIZE * 2).unwrap();
        list.insert(1).unwrap();
        list.insert(2).unwrap();
        assert!(matches!(
            list.insert(3),
            Err(ListError::AllocationFailed(PoolError::OutOfSpace { .. }))
        ));
        assert_eq!(list.values(), vec![1, 2]);
        list.delete(1).unwrap();
        list.insert(3).unwrap();
        assert_eq!(list.values(), vec![2, 3]);
    }

    #[test]
    fn display_range_bounds_are_inclusive() {
        let list = list_of(&[1, 2, 3, 4, 5]);
        let two = list.search(2).unwrap();
        let four = list.search(4).unwrap();
        assert_eq!(list.render(Some(two), Some(four)), "[2, 3, 4]");
        assert_eq!(list.render(Some(four), None), "[4, 5]");
        assert_eq!(list.render(None, Some(two)), "[1, 2]");
        assert_eq!(list.render(Some(two), Some(two)), "[2]");
    }

    #[test]
    fn display_range_end_before_start_runs_to_tail() {
        let list = list_of(&[1, 2, 3]);
        let one = list.search(1).unwrap();
        let two = list.search(2).unwrap();
        assert_eq!(list.render(Some(two), Some(one)), "[2, 3]");
    }

    #[test]
    fn display_range_from_stale_start_is_empty() {
        let list = list_of(&[1, 2]);
        let one = list.search(1).unwrap();
        list.delete(1).unwrap();
        assert_eq!(list.render(Some(one), None), "[]");
        assert_eq!(ConcurrentList::init(64).unwrap().render(None, None), "[]");
    }

    #[test]
    fn cleanup_releases_everything() {
        let list = list_of(&[1, 2, 3]);
        let two = list.search(2).unwrap();
        list.cleanup();
        assert!(list.is_empty());
        assert_eq!(list.count(), 0);
        assert_eq!(list.get(two), Err(ListError::NullReference));
        assert!(matches!(
            list.insert(4),
            Err(ListError::AllocationFailed(PoolError::Uninitialized))
        ));
        assert!(matches!(
            list.pool_stats(),
            Err(ListError::Pool(PoolError::Uninitialized))
        ));
        assert!(list.pool_blocks().is_empty());
        // Idempotent.
        list.cleanup();
    }

    #[test]
    fn pool_tracks_one_block_per_node() {
        let list = list_of(&[1, 2, 3]);
        let stats = list.pool_stats().unwrap();
        assert_eq!(stats.live_blocks, 3);
        assert_eq!(stats.used, 3 * NODE_SIZE);
        assert!(list.pool_blocks().iter().all(|b| b.len == NODE_SIZE));
    }

    #[test]
    fn invalid_capacities() {
        assert_eq!(
            ConcurrentList::init(0).unwrap_err(),
            ListError::InvalidCapacity { capacity: 0 }
        );
    }

    #[test]
    fn sub_node_capacity_initialises_but_cannot_insert() {
        let list = ConcurrentList::init(8).unwrap();
        assert!(list.is_empty());
        assert!(matches!(
            list.insert(1),
            Err(ListError::AllocationFailed(
                PoolError::InsufficientCapacity { .. }
            ))
        ));
        assert!(list.is_empty());
        assert_eq!(list.pool_stats().unwrap().capacity, 8);
    }

    #[test]
    fn range_debug_shows_position() {
        let list = list_of(&[1]);
        let head = list.head();
        let range = list.display_range(None, None);
        assert_eq!(
            format!("{range:?}"),
            format!("Range {{ next: {head:?}, end: None }}")
        );
    }
}
