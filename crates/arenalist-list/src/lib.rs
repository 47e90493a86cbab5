//! Concurrent singly linked list for arenalist.
//!
//! A [`ConcurrentList`] stores `u16` values in fixed-size nodes carved from
//! its own [`Pool`](arenalist_pool::Pool). Each node has a dedicated mutex;
//! operations walk the list hand over hand so that writers in different
//! parts of the list do not block each other.
//!
//! # Locking
//!
//! | Operation       | List mutex                  | Node locks                 |
//! |-----------------|-----------------------------|----------------------------|
//! | `insert`        | whole call                  | hand over hand to the tail |
//! | `insert_after`  | not taken                   | the reference node only    |
//! | `insert_before` | whole call                  | hand over hand to target   |
//! | `delete`        | until the node is unlinked  | predecessor and match      |
//! | `search`        | until the head is locked    | hand over hand             |
//! | `display_range` | until the start is locked   | hand over hand, lazily     |
//! | `cleanup`       | whole call                  | hand over hand, releasing  |
//!
//! Node references are [`NodeRef`] values carrying a generation stamp, so
//! a reference to a deleted node is reported as
//! [`ListError::NullReference`] rather than silently aliasing whatever now
//! occupies its slot.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod list;
pub mod node;

pub use error::ListError;
pub use list::{ConcurrentList, Range};
pub use node::{NodeRef, NODE_SIZE};
