//! Seeded workload fixtures.
//!
//! Everything here is driven by a `ChaCha8Rng` seeded from a `u64`, so a
//! failing test can be replayed from the seed in its message.

use arenalist_list::{ConcurrentList, ListError};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One list operation in a generated workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Insert(u16),
    Delete(u16),
    Search(u16),
}

impl Op {
    /// Run the operation, discarding the node reference on success.
    pub fn apply(self, list: &ConcurrentList) -> Result<(), ListError> {
        match self {
            Op::Insert(v) => list.insert(v).map(|_| ()),
            Op::Delete(v) => list.delete(v),
            Op::Search(v) => list.search(v).map(|_| ()),
        }
    }
}

/// `len` values drawn uniformly from `0..distinct`.
///
/// A small `distinct` produces plenty of duplicates, which is what the
/// first-occurrence tests want.
pub fn seeded_values(seed: u64, len: usize, distinct: u16) -> Vec<u16> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let distinct = u32::from(distinct.max(1));
    (0..len)
        .map(|_| (rng.next_u32() % distinct) as u16)
        .collect()
}

/// A mixed workload: roughly half inserts, a quarter deletes and a
/// quarter searches over values in `0..distinct`.
pub fn op_sequence(seed: u64, len: usize, distinct: u16) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let distinct = u32::from(distinct.max(1));
    (0..len)
        .map(|_| {
            let value = (rng.next_u32() % distinct) as u16;
            match rng.next_u32() % 4 {
                0 | 1 => Op::Insert(value),
                2 => Op::Delete(value),
                _ => Op::Search(value),
            }
        })
        .collect()
}

/// A list over a `capacity`-byte pool holding `values` in order.
///
/// # Panics
///
/// If the pool cannot hold every value.
pub fn list_with(values: &[u16], capacity: usize) -> ConcurrentList {
    let list = ConcurrentList::init(capacity).expect("fixture capacity must be valid");
    for &v in values {
        list.insert(v).expect("fixture capacity too small for values");
    }
    list
}
