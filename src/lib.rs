//! Prometheus metrics for PostgreSQL connection pools.
//!
//! A [`StatsCollector`] reads a [`PoolStat`] snapshot from a
//! [`StatsProvider`] on every scrape and emits the twelve `pgxpool_*`
//! metrics, counters and gauges, with an optional const label set so
//! several pools can share one registry.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use pgpool_prometheus::{StatsCollector, StatsTracker};
//!
//! # fn main() -> pgpool_prometheus::Result<()> {
//! let tracker = Arc::new(StatsTracker::new(10));
//! let labels = HashMap::from([("pool".to_string(), "primary".to_string())]);
//! let collector = StatsCollector::new(tracker.clone(), labels)?;
//!
//! let registry = prometheus::Registry::new();
//! registry.register(Box::new(collector))?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod collector;
pub mod config;
pub mod error;
pub mod stats;
pub mod tracker;

pub use collector::{Kind, Statistic, StatsCollector};
pub use error::{Error, Result};
pub use stats::{PoolStat, StatsProvider};
pub use tracker::{DestroyReason, StatsTracker};
