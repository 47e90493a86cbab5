//! The pool allocator: first-fit placement over a single arena.
//!
//! [`Pool`] owns one [`Arena`] and the [`BlockRegistry`] describing which of
//! its ranges are in use. Every operation takes the pool mutex for its whole
//! duration, so the registry is only ever observed in a consistent state.
//!
//! ```text
//! Pool
//! └── Mutex<Option<LivePool>>        (None = uninitialised or torn down)
//!     ├── Arc<Arena>                 (shared with block owners for byte access)
//!     └── BlockRegistry              (sorted (start, len) descriptors)
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::arena::Arena;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::handle::BlockHandle;
use crate::registry::{BlockDescriptor, BlockRegistry};

/// How a successful resize was satisfied. Diagnostic only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResizeKind {
    /// New size not larger than the old one; length updated in place.
    Shrunk,
    /// The gap directly after the block absorbed the growth.
    GrownInPlace,
    /// Destination found while the source was still allocated.
    Moved,
    /// Destination only fit once the source range was released.
    Relocated,
}

/// State that exists only between `init` and `deinit`.
struct LivePool {
    arena: Arc<Arena>,
    registry: BlockRegistry,
    zero_on_alloc: bool,
}

impl LivePool {
    fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    fn handle(&self, block: BlockDescriptor) -> BlockHandle {
        BlockHandle::new(self.arena.id(), block.start, block.len)
    }

    fn check_size(&self, size: usize) -> Result<(), PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }
        if size > self.capacity() {
            return Err(PoolError::InsufficientCapacity {
                requested: size,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Resolve a handle to its registry index and current descriptor.
    fn lookup(&self, handle: BlockHandle) -> Result<(usize, BlockDescriptor), PoolError> {
        let invalid = PoolError::InvalidHandle {
            offset: handle.offset,
        };
        if handle.arena != self.arena.id() {
            return Err(invalid);
        }
        let index = self.registry.position(handle.offset).ok_or(invalid.clone())?;
        let block = self.registry.get(index).copied().ok_or(invalid)?;
        Ok((index, block))
    }

    fn zero_tail(&self, start: usize, from: usize, to: usize) {
        if self.zero_on_alloc && to > from {
            self.arena.fill(start + from, to - from, 0);
        }
    }

    fn allocate(&mut self, size: usize) -> Result<BlockHandle, PoolError> {
        self.check_size(size)?;
        let capacity = self.capacity();
        let (index, start) =
            self.registry
                .find_gap(size, capacity)
                .ok_or_else(|| PoolError::OutOfSpace {
                    requested: size,
                    largest_gap: self.registry.largest_gap(capacity),
                })?;
        let block = BlockDescriptor { start, len: size };
        self.registry.insert_at(index, block);
        self.zero_tail(start, 0, size);
        Ok(self.handle(block))
    }

    fn free(&mut self, handle: BlockHandle) -> Result<BlockDescriptor, PoolError> {
        let (index, _) = self.lookup(handle)?;
        Ok(self.registry.remove(index))
    }

    fn resize(
        &mut self,
        handle: BlockHandle,
        new_size: usize,
    ) -> Result<(BlockHandle, ResizeKind), PoolError> {
        let (index, block) = self.lookup(handle)?;
        self.check_size(new_size)?;
        let capacity = self.capacity();

        if new_size <= block.len {
            self.registry.set_len(index, new_size);
            let shrunk = BlockDescriptor {
                start: block.start,
                len: new_size,
            };
            return Ok((self.handle(shrunk), ResizeKind::Shrunk));
        }

        if block.len + self.registry.gap_after(index, capacity) >= new_size {
            self.registry.set_len(index, new_size);
            self.zero_tail(block.start, block.len, new_size);
            let grown = BlockDescriptor {
                start: block.start,
                len: new_size,
            };
            return Ok((self.handle(grown), ResizeKind::GrownInPlace));
        }

        let mut saved = vec![0u8; block.len];
        self.arena.load(block.start, &mut saved);

        // Allocate-first: the source stays registered while we search, so
        // the destination can never overlap it.
        if let Some((dst_index, dst)) = self.registry.find_gap(new_size, capacity) {
            let moved = BlockDescriptor {
                start: dst,
                len: new_size,
            };
            self.registry.insert_at(dst_index, moved);
            self.arena.store(dst, &saved);
            self.zero_tail(dst, block.len, new_size);
            let src_index = if dst_index <= index { index + 1 } else { index };
            self.registry.remove(src_index);
            return Ok((self.handle(moved), ResizeKind::Moved));
        }

        // Only a gap that includes the source's own range can still fit.
        // The source bytes are already captured in `saved`.
        let source = self.registry.remove(index);
        match self.registry.find_gap(new_size, capacity) {
            Some((dst_index, dst)) => {
                let relocated = BlockDescriptor {
                    start: dst,
                    len: new_size,
                };
                self.registry.insert_at(dst_index, relocated);
                self.arena.store(dst, &saved);
                self.zero_tail(dst, block.len, new_size);
                Ok((self.handle(relocated), ResizeKind::Relocated))
            }
            None => {
                let largest_gap = self.registry.largest_gap(capacity);
                self.registry.insert_at(index, source);
                Err(PoolError::OutOfSpace {
                    requested: new_size,
                    largest_gap,
                })
            }
        }
    }

    fn stats(&self) -> PoolStats {
        let capacity = self.capacity();
        let used = self.registry.used_bytes();
        PoolStats {
            capacity,
            used,
            free: capacity - used,
            live_blocks: self.registry.len(),
            largest_gap: self.registry.largest_gap(capacity),
        }
    }
}

/// A point-in-time summary of pool occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Total arena size in bytes.
    pub capacity: usize,
    /// Bytes covered by live blocks.
    pub used: usize,
    /// Bytes not covered by any live block (possibly fragmented).
    pub free: usize,
    /// Number of live blocks.
    pub live_blocks: usize,
    /// Largest single gap, i.e. the biggest request that would succeed.
    pub largest_gap: usize,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blocks, {}/{} bytes used, largest gap {} bytes",
            self.live_blocks, self.used, self.capacity, self.largest_gap
        )
    }
}

/// A fixed-capacity, thread-safe, first-fit allocator.
///
/// A pool starts uninitialised. [`init`](Self::init) reserves the arena;
/// [`deinit`](Self::deinit) releases it and may be called any number of
/// times. Between the two, [`allocate`](Self::allocate),
/// [`free`](Self::free) and [`resize`](Self::resize) place and remove
/// blocks. Before `init` or after `deinit` every operation fails with
/// [`PoolError::Uninitialized`].
///
/// The pool never calls back into its users, so a caller may hold its own
/// locks while calling any pool method.
pub struct Pool {
    state: Mutex<Option<LivePool>>,
}

// Compile-time assertion: Pool must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Pool>();
};

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Create an uninitialised pool.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// Create a pool and initialise it with `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self, PoolError> {
        let pool = Self::new();
        pool.init(capacity)?;
        Ok(pool)
    }

    fn lock(&self) -> MutexGuard<'_, Option<LivePool>> {
        // Every critical section completes its registry update before any
        // fallible step, so a poisoned guard still protects valid state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve an arena of `capacity` bytes with default options.
    pub fn init(&self, capacity: usize) -> Result<(), PoolError> {
        self.init_with(PoolConfig::new(capacity))
    }

    /// Reserve an arena as described by `config`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidCapacity`] if `config.capacity` is zero.
    /// - [`PoolError::AlreadyInitialized`] if the pool is live.
    /// - [`PoolError::ArenaUnavailable`] if the storage cannot be reserved;
    ///   the pool then stays uninitialised.
    pub fn init_with(&self, config: PoolConfig) -> Result<(), PoolError> {
        config.validate()?;
        let mut state = self.lock();
        if state.is_some() {
            warn!("init called on a live pool");
            return Err(PoolError::AlreadyInitialized);
        }
        let arena = Arena::try_new(config.capacity).inspect_err(|e| {
            warn!(capacity = config.capacity, error = %e, "arena reservation failed");
        })?;
        info!(arena = %arena.id(), capacity = config.capacity, "pool initialised");
        *state = Some(LivePool {
            arena: Arc::new(arena),
            registry: BlockRegistry::new(),
            zero_on_alloc: config.zero_on_alloc,
        });
        Ok(())
    }

    /// Allocate `size` bytes using first-fit placement.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidSize`] for a zero-byte request.
    /// - [`PoolError::InsufficientCapacity`] if `size` exceeds the arena.
    /// - [`PoolError::OutOfSpace`] if no gap is large enough.
    pub fn allocate(&self, size: usize) -> Result<BlockHandle, PoolError> {
        let mut state = self.lock();
        let live = state.as_mut().ok_or(PoolError::Uninitialized)?;
        match live.allocate(size) {
            Ok(handle) => {
                debug!(offset = handle.offset(), size, "allocated block");
                Ok(handle)
            }
            Err(e) => {
                warn!(size, error = %e, "allocation rejected");
                Err(e)
            }
        }
    }

    /// Release the block named by `handle`.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHandle`] if the handle is from another arena or
    /// no live block starts at its offset (including a second free of the
    /// same block).
    pub fn free(&self, handle: BlockHandle) -> Result<(), PoolError> {
        let mut state = self.lock();
        let live = state.as_mut().ok_or(PoolError::Uninitialized)?;
        match live.free(handle) {
            Ok(block) => {
                debug!(offset = block.start, size = block.len, "freed block");
                Ok(())
            }
            Err(e) => {
                warn!(handle = %handle, error = %e, "free rejected");
                Err(e)
            }
        }
    }

    /// Change the size of a block, moving it if necessary.
    ///
    /// Shrinking and growth into the adjacent gap keep the block in place.
    /// Otherwise a destination is found before the source is released, and
    /// only if none exists is the source's own range considered. The first
    /// `min(old, new)` bytes are preserved in every case; if no destination
    /// exists the block is left exactly as it was.
    ///
    /// Returns the handle to use from now on (the offset may change).
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidHandle`] as for [`free`](Self::free).
    /// - [`PoolError::InvalidSize`] for a new size of zero.
    /// - [`PoolError::InsufficientCapacity`] if `new_size` exceeds the arena.
    /// - [`PoolError::OutOfSpace`] if the block cannot grow anywhere.
    pub fn resize(&self, handle: BlockHandle, new_size: usize) -> Result<BlockHandle, PoolError> {
        let mut state = self.lock();
        let live = state.as_mut().ok_or(PoolError::Uninitialized)?;
        match live.resize(handle, new_size) {
            Ok((resized, kind)) => {
                debug!(
                    from = handle.offset(),
                    to = resized.offset(),
                    new_size,
                    how = ?kind,
                    "resized block"
                );
                Ok(resized)
            }
            Err(e) => {
                warn!(handle = %handle, new_size, error = %e, "resize rejected");
                Err(e)
            }
        }
    }

    /// Release every block and the arena.
    ///
    /// Idempotent: calling it on an uninitialised or already torn-down pool
    /// does nothing. Outstanding [`Arc<Arena>`] clones keep the bytes alive
    /// until dropped, but the pool no longer hands out or accepts handles.
    pub fn deinit(&self) {
        let mut state = self.lock();
        match state.take() {
            Some(mut live) => {
                let live_blocks = live.registry.len();
                live.registry.clear();
                info!(arena = %live.arena.id(), live_blocks, "pool torn down");
            }
            None => debug!("deinit on an uninitialised pool"),
        }
    }

    /// Whether the pool currently owns an arena.
    pub fn is_live(&self) -> bool {
        self.lock().is_some()
    }

    /// Arena capacity in bytes, or 0 when uninitialised.
    pub fn capacity(&self) -> usize {
        self.lock().as_ref().map_or(0, LivePool::capacity)
    }

    /// Shared access to the live arena.
    ///
    /// Exposed for node storage layered on a pool that only ever serves
    /// one block size and keeps its own per-block locks. Only fixed-width
    /// scalar accessors are public on [`Arena`]; general byte access goes
    /// through [`read`](Self::read) and [`write`](Self::write), which
    /// check the handle against the registry.
    #[doc(hidden)]
    pub fn arena(&self) -> Result<Arc<Arena>, PoolError> {
        self.lock()
            .as_ref()
            .map(|live| Arc::clone(&live.arena))
            .ok_or(PoolError::Uninitialized)
    }

    /// Occupancy summary.
    pub fn stats(&self) -> Result<PoolStats, PoolError> {
        self.lock()
            .as_ref()
            .map(LivePool::stats)
            .ok_or(PoolError::Uninitialized)
    }

    /// Snapshot of every live block in address order.
    ///
    /// Empty when uninitialised.
    pub fn blocks(&self) -> Vec<BlockDescriptor> {
        self.lock()
            .as_ref()
            .map(|live| live.registry.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Copy out the current contents of a block.
    pub fn read(&self, handle: BlockHandle) -> Result<Vec<u8>, PoolError> {
        let state = self.lock();
        let live = state.as_ref().ok_or(PoolError::Uninitialized)?;
        let (_, block) = live.lookup(handle)?;
        let mut buf = vec![0u8; block.len];
        live.arena.load(block.start, &mut buf);
        Ok(buf)
    }

    /// Write `bytes` into a block starting `offset` bytes from its start.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfBounds`] if the write would run past the block's
    /// current length.
    pub fn write(&self, handle: BlockHandle, offset: usize, bytes: &[u8]) -> Result<(), PoolError> {
        let state = self.lock();
        let live = state.as_ref().ok_or(PoolError::Uninitialized)?;
        let (_, block) = live.lookup(handle)?;
        let end = offset.saturating_add(bytes.len());
        if end > block.len {
            return Err(PoolError::OutOfBounds {
                block: block.start,
                end,
                len: block.len,
            });
        }
        live.arena.store(block.start + offset, bytes);
        Ok(())
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        match state.as_ref() {
            Some(live) => f
                .debug_struct("Pool")
                .field("arena", &live.arena)
                .field("blocks", &live.registry.len())
                .finish(),
            None => f.debug_struct("Pool").field("arena", &"uninitialised").finish(),
        }
    }
}
