//! End-to-end concurrent list example.
//!
//! Demonstrates: init a list → prefill → run the reference workload on
//! worker threads → inspect pool occupancy → cleanup.
//!
//! Set `RUST_LOG=arenalist_list=debug` to see per-operation events.

use arenalist_bench::{prefilled_list, reference_profile, run_workload};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== arenalist workload example ===\n");

    let profile = reference_profile();
    let list = prefilled_list(&profile, 42).unwrap();
    println!(
        "prefilled {} nodes: {}",
        list.count(),
        list.pool_stats().unwrap()
    );

    for round in 1..=3u64 {
        let tally = run_workload(&list, &profile, round);
        println!(
            "  round {round}: +{} -{} found={} missed={} rejected={} -> {} nodes",
            tally.inserted,
            tally.deleted,
            tally.found,
            tally.missed,
            tally.rejected,
            list.count(),
        );
    }

    // The range holds a node lock until it is dropped at the end of the
    // statement.
    let first: Vec<u16> = list.display_range(None, None).take(5).collect();
    println!("\nfirst values: {first:?}");
    println!("pool: {}", list.pool_stats().unwrap());

    list.cleanup();
    println!("after cleanup: {} nodes", list.count());
    println!("Done.");
}
