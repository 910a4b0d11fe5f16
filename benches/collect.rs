//! Scrape cost benchmark: time `collect` on one collector and a full
//! `gather` + text encode over a registry with several pools.
//!
//! Usage:
//!   cargo bench --bench collect
//!
//! PGPOOL_BENCH_ITERATIONS and PGPOOL_BENCH_POOLS tune the run.

use pgpool_prometheus::{StatsCollector, StatsTracker};
use prometheus::core::Collector;
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Run `f` `iterations` times, return average latency.
fn bench(iterations: u32, mut f: impl FnMut()) -> Duration {
    let start = Instant::now();
    for _ in 0..iterations {
        f();
    }
    start.elapsed() / iterations
}

/// A tracker with every counter moved off zero.
fn busy_tracker(max_conns: u32) -> Arc<StatsTracker> {
    let tracker = Arc::new(StatsTracker::new(max_conns));
    for _ in 0..max_conns {
        tracker.begin_construct();
        tracker.construct_succeeded();
    }
    tracker.acquired(Duration::from_millis(2), true);
    tracker.acquire_canceled();
    tracker
}

fn main() {
    let iterations: u32 = std::env::var("PGPOOL_BENCH_ITERATIONS")
        .unwrap_or_else(|_| "100000".into())
        .parse()
        .unwrap_or(100_000);
    let pools: u32 = std::env::var("PGPOOL_BENCH_POOLS")
        .unwrap_or_else(|_| "8".into())
        .parse()
        .unwrap_or(8);

    let warmup = 1000;

    println!("pgpool-prometheus scrape benchmark");
    println!("──────────────────────────────────");
    println!("iterations:   {iterations}");
    println!("pools:        {pools}");
    println!();

    // ─── Single collector ────────────────────────────────────────────

    let labels = HashMap::from([("pool".to_string(), "bench".to_string())]);
    let collector = StatsCollector::new(busy_tracker(16), labels).unwrap();

    bench(warmup, || {
        black_box(collector.collect());
    });
    let collect_avg = bench(iterations, || {
        black_box(collector.collect());
    });

    // ─── Registry gather + encode ────────────────────────────────────

    let registry = Registry::new();
    for i in 0..pools {
        let labels = HashMap::from([("pool".to_string(), format!("pool-{i}"))]);
        let collector = StatsCollector::new(busy_tracker(16), labels).unwrap();
        registry.register(Box::new(collector)).unwrap();
    }

    let encoder = TextEncoder::new();
    let mut buf = Vec::with_capacity(16 * 1024);
    let scrape_iterations = (iterations / 10).max(1);

    let scrape_avg = bench(scrape_iterations, || {
        buf.clear();
        encoder.encode(&registry.gather(), &mut buf).unwrap();
        black_box(&buf);
    });

    // ─── Results ─────────────────────────────────────────────────────

    println!("Results (average):");
    println!(
        "  collect:          {:>8.2}us",
        collect_avg.as_nanos() as f64 / 1000.0
    );
    println!(
        "  gather + encode:  {:>8.2}us ({} bytes)",
        scrape_avg.as_nanos() as f64 / 1000.0,
        buf.len()
    );
}
