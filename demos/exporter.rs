//! Demo exporter: two simulated pools behind one `/metrics` endpoint.
//!
//! Usage:
//!   cargo run --example exporter -- --port 9188 --label env=dev
//!   curl -s localhost:9188/metrics | grep pgxpool_
//!
//! Each simulated pool churns through the `StatsTracker` lifecycle
//! (construct, acquire, release, idle reaping) so every metric moves.

use pgpool_prometheus::admin::{self, AdminState};
use pgpool_prometheus::config::Config;
use pgpool_prometheus::{DestroyReason, StatsCollector, StatsTracker};
use prometheus::Registry;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const BANNER: &str = r#"
  ╔══════════════════════════════════════════════════╗
  ║               P G P O O L - E X P O R T E R      ║
  ║      Prometheus metrics for connection pools     ║
  ╚══════════════════════════════════════════════════╝
"#;

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal: {e}");
            std::process::exit(1);
        }
    };

    // Set up tracing with the configured log level
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    eprintln!("{BANNER}");

    if let Err(e) = run(config).await {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> pgpool_prometheus::Result<()> {
    let registry = Registry::new();

    for (name, max_conns) in [("primary", 10), ("replica", 4)] {
        let tracker = Arc::new(StatsTracker::new(max_conns));

        let mut labels = config.labels.clone();
        labels.insert("pool".into(), name.into());
        registry.register(Box::new(StatsCollector::new(tracker.clone(), labels)?))?;

        info!(pool = name, max_conns, "simulated pool");
        tokio::spawn(simulate(name, max_conns, tracker));
    }

    admin::serve(AdminState::new(registry), &config.listen_addr()).await
}

/// Drive a tracker with a random workload: connections are opened up to
/// `max_conns`, checked out and back in, and occasionally reaped.
async fn simulate(name: &'static str, max_conns: u32, tracker: Arc<StatsTracker>) {
    let mut open = 0u32;
    let mut checked_out = 0u32;

    loop {
        let (step, wait_ms, roll) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..6u8), rng.gen_range(0..40u64), rng.gen_bool(0.1))
        };

        match step {
            0 if open < max_conns => {
                tracker.begin_construct();
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                if roll {
                    tracker.construct_failed();
                } else {
                    tracker.construct_succeeded();
                    open += 1;
                }
            }
            1 | 2 if checked_out < open => {
                let waited_for_empty = checked_out + 1 == open;
                tracker.acquired(Duration::from_millis(wait_ms), waited_for_empty);
                checked_out += 1;
            }
            1 | 2 => tracker.acquire_canceled(),
            3 | 4 if checked_out > 0 => {
                if roll {
                    tracker.discard_acquired();
                    open -= 1;
                } else {
                    tracker.released();
                }
                checked_out -= 1;
            }
            5 if open > checked_out => {
                let reason = if roll {
                    DestroyReason::MaxLifetime
                } else {
                    DestroyReason::MaxIdle
                };
                tracker.destroy_idle(reason);
                open -= 1;
            }
            _ => {}
        }

        debug!(pool = name, open, checked_out, "simulation step");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
