//! Arenalist: a fixed-capacity first-fit arena allocator and a concurrent
//! singly linked list whose nodes live inside it.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the arenalist sub-crates. For most users, adding `arenalist` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use arenalist::prelude::*;
//!
//! // 64 bytes hold four 16-byte nodes.
//! let list = ConcurrentList::init(64).unwrap();
//! list.insert(1).unwrap();
//! let two = list.insert(2).unwrap();
//! list.insert(3).unwrap();
//! assert_eq!(list.render(None, None), "[1, 2, 3]");
//!
//! list.insert_after(Some(two), 9).unwrap();
//! list.delete(2).unwrap();
//! assert_eq!(list.values(), vec![1, 9, 3]);
//! assert_eq!(list.search(2), Err(ListError::NotFound));
//!
//! list.cleanup();
//! assert!(list.is_empty());
//! ```
//!
//! The pool can also be used on its own:
//!
//! ```rust
//! use arenalist::prelude::*;
//!
//! let pool = Pool::with_capacity(100).unwrap();
//! let a = pool.allocate(40).unwrap();
//! let b = pool.allocate(40).unwrap();
//! pool.free(a).unwrap();
//! // First fit: the freed leading gap is reused.
//! assert_eq!(pool.allocate(30).unwrap().offset(), 0);
//! assert!(matches!(pool.allocate(40), Err(PoolError::OutOfSpace { .. })));
//! # let _ = b;
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`pool`] | `arenalist-pool` | Arena, block registry, first-fit `Pool` |
//! | [`list`] | `arenalist-list` | `ConcurrentList`, node references, ranges |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// First-fit arena allocation (`arenalist-pool`).
///
/// [`pool::Pool`] owns one [`pool::Arena`] and an address-ordered
/// [`pool::BlockRegistry`]; blocks are addressed by [`pool::BlockHandle`].
pub use arenalist_pool as pool;

/// The concurrent list (`arenalist-list`).
///
/// [`list::ConcurrentList`] walks its nodes hand over hand and hands out
/// stamped [`list::NodeRef`]s.
pub use arenalist_list as list;

/// Common imports for typical arenalist usage.
///
/// ```rust
/// use arenalist::prelude::*;
/// ```
pub mod prelude {
    // Pool
    pub use arenalist_pool::{BlockHandle, Pool, PoolConfig, PoolError, PoolStats};

    // List
    pub use arenalist_list::{ConcurrentList, ListError, NodeRef};
}
