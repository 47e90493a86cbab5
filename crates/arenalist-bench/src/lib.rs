//! Benchmark profiles and a threaded workload driver for arenalist.
//!
//! - [`reference_profile`]: 4 workers over a 4K-node pool
//! - [`stress_profile`]: 16 workers over a 16K-node pool
//! - [`prefilled_list`]: a list seeded to a profile's starting size
//! - [`run_workload`]: fans seeded op batches out to worker threads over a
//!   crossbeam channel and gathers a [`Tally`] of outcomes

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::thread;

use arenalist_list::{ConcurrentList, ListError, NODE_SIZE};
use arenalist_test_utils::{op_sequence, seeded_values, Op};
use crossbeam_channel::{Receiver, Sender};

/// Ops handed to a worker in one message.
const BATCH: usize = 64;

/// Shape of one benchmark workload.
#[derive(Clone, Copy, Debug)]
pub struct ListProfile {
    /// Pool size in bytes.
    pub capacity: usize,
    /// Nodes inserted before the workload starts.
    pub prefill: usize,
    /// Worker threads.
    pub workers: usize,
    /// Ops generated per worker.
    pub ops_per_worker: usize,
    /// Values are drawn from `0..distinct`.
    pub distinct: u16,
}

/// 4 workers, 4K-node pool, 256 nodes prefilled.
pub fn reference_profile() -> ListProfile {
    ListProfile {
        capacity: NODE_SIZE * 4096,
        prefill: 256,
        workers: 4,
        ops_per_worker: 512,
        distinct: 64,
    }
}

/// 16 workers, 16K-node pool, 4K nodes prefilled.
pub fn stress_profile() -> ListProfile {
    ListProfile {
        capacity: NODE_SIZE * 16 * 1024,
        prefill: 4096,
        workers: 16,
        ops_per_worker: 2048,
        distinct: 1024,
    }
}

/// Build a list for `profile` holding `profile.prefill` seeded values.
pub fn prefilled_list(profile: &ListProfile, seed: u64) -> Result<ConcurrentList, ListError> {
    let list = ConcurrentList::init(profile.capacity)?;
    for v in seeded_values(seed, profile.prefill, profile.distinct) {
        list.insert(v)?;
    }
    Ok(list)
}

/// Outcome counts for a batch of ops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    /// Inserts that linked a node.
    pub inserted: usize,
    /// Deletes that removed a node.
    pub deleted: usize,
    /// Searches that matched a node.
    pub found: usize,
    /// Deletes and searches that matched nothing.
    pub missed: usize,
    /// Inserts refused by the pool.
    pub rejected: usize,
}

impl Tally {
    fn record(&mut self, op: Op, result: Result<(), ListError>) {
        match (op, result) {
            (Op::Insert(_), Ok(())) => self.inserted += 1,
            (Op::Insert(_), Err(_)) => self.rejected += 1,
            (Op::Delete(_), Ok(())) => self.deleted += 1,
            (Op::Search(_), Ok(())) => self.found += 1,
            (Op::Delete(_) | Op::Search(_), Err(_)) => self.missed += 1,
        }
    }

    fn merge(&mut self, other: Tally) {
        self.inserted += other.inserted;
        self.deleted += other.deleted;
        self.found += other.found;
        self.missed += other.missed;
        self.rejected += other.rejected;
    }

    /// Total ops accounted for.
    pub fn total(&self) -> usize {
        self.inserted + self.deleted + self.found + self.missed + self.rejected
    }
}

fn worker_loop(list: &ConcurrentList, task_rx: Receiver<Vec<Op>>, reply: Sender<Tally>) {
    let mut tally = Tally::default();
    while let Ok(batch) = task_rx.recv() {
        for op in batch {
            tally.record(op, op.apply(list));
        }
    }
    // The collector outlives every worker, so the send cannot fail.
    let _ = reply.send(tally);
}

/// Run `profile.workers * profile.ops_per_worker` seeded ops against
/// `list` on `profile.workers` threads and return the combined tally.
///
/// Batches go through one bounded channel, so a fast worker picks up more
/// batches than a slow one.
pub fn run_workload(list: &ConcurrentList, profile: &ListProfile, seed: u64) -> Tally {
    let (task_tx, task_rx) = crossbeam_channel::bounded::<Vec<Op>>(profile.workers * 2);
    let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<Tally>();

    thread::scope(|s| {
        for _ in 0..profile.workers {
            let (task_rx, reply_tx) = (task_rx.clone(), reply_tx.clone());
            s.spawn(move || worker_loop(list, task_rx, reply_tx));
        }
        drop(task_rx);
        drop(reply_tx);

        for w in 0..profile.workers as u64 {
            let ops = op_sequence(seed ^ (w << 32), profile.ops_per_worker, profile.distinct);
            for chunk in ops.chunks(BATCH) {
                if task_tx.send(chunk.to_vec()).is_err() {
                    return;
                }
            }
        }
        drop(task_tx);
    });

    let mut total = Tally::default();
    for tally in reply_rx.iter() {
        total.merge(tally);
    }
    total
}
