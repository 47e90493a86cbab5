//! Test utilities for arenalist development.
//!
//! Structural checkers for pool registries and lists, plus seeded
//! workload fixtures (see [`fixtures`]) shared by the integration tests
//! and benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{list_with, op_sequence, seeded_values, Op};

use arenalist_list::{ConcurrentList, NODE_SIZE};
use arenalist_pool::BlockDescriptor;

/// Check that `blocks` is a valid registry snapshot for an arena of
/// `capacity` bytes: non-empty blocks, strictly address ordered, pairwise
/// disjoint, all inside the arena.
pub fn check_registry(blocks: &[BlockDescriptor], capacity: usize) -> Result<(), String> {
    let mut cursor = 0;
    for (i, block) in blocks.iter().enumerate() {
        if block.len == 0 {
            return Err(format!("block {i} at {} is empty", block.start));
        }
        if block.start < cursor {
            return Err(format!(
                "block {i} at {} overlaps or precedes the previous end {cursor}",
                block.start
            ));
        }
        if block.end() > capacity {
            return Err(format!(
                "block {i} [{}, {}) runs past capacity {capacity}",
                block.start,
                block.end()
            ));
        }
        cursor = block.end();
    }
    Ok(())
}

/// Check that a quiescent list agrees with its pool: one node-sized,
/// node-aligned block per reachable node and a well-formed registry.
pub fn check_list(list: &ConcurrentList) -> Result<(), String> {
    let nodes = list.count();
    let stats = list.pool_stats().map_err(|e| e.to_string())?;
    if stats.live_blocks != nodes {
        return Err(format!(
            "{nodes} reachable nodes but {} live blocks",
            stats.live_blocks
        ));
    }
    let blocks = list.pool_blocks();
    if let Some(b) = blocks
        .iter()
        .find(|b| b.len != NODE_SIZE || b.start % NODE_SIZE != 0)
    {
        return Err(format!("block {b:?} is not a node slot"));
    }
    check_registry(&blocks, stats.capacity)
}
