//! Pool statistics — the snapshot type and the provider trait.
//!
//! `PoolStat` is the boundary between a connection pool and the collector.
//! A pool integration maps whatever counters it keeps into a `PoolStat`;
//! tests build one directly without standing up a pool.

use std::time::Duration;

/// Point-in-time statistics of a connection pool.
///
/// Cumulative fields (`*_count`, `acquire_duration`) only grow over the life
/// of the pool. Connection counts describe the pool at the instant the
/// snapshot was taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStat {
    /// Cumulative count of successful acquires.
    pub acquire_count: u64,
    /// Total time spent waiting in successful acquires.
    pub acquire_duration: Duration,
    /// Connections currently checked out.
    pub acquired_conns: u32,
    /// Cumulative count of acquires canceled before they succeeded.
    pub canceled_acquire_count: u64,
    /// Connections with construction in progress.
    pub constructing_conns: u32,
    /// Cumulative count of successful acquires that waited on an empty pool.
    pub empty_acquire_count: u64,
    /// Connections currently idle.
    pub idle_conns: u32,
    /// Configured pool capacity.
    pub max_conns: u32,
    /// Sum of constructing, acquired, and idle connections.
    pub total_conns: u32,
    /// Cumulative count of connections opened.
    pub new_conns_count: u64,
    /// Cumulative count of connections closed for exceeding their max lifetime.
    pub max_lifetime_destroy_count: u64,
    /// Cumulative count of connections closed for exceeding their max idle time.
    pub max_idle_destroy_count: u64,
}

/// Anything that can produce a fresh `PoolStat` on demand.
///
/// `stat` is called once per scrape, possibly from several threads at once,
/// so implementations must be cheap and internally synchronized. A panic in
/// `stat` aborts the scrape that triggered it.
pub trait StatsProvider: Send + Sync {
    fn stat(&self) -> PoolStat;
}

impl<F> StatsProvider for F
where
    F: Fn() -> PoolStat + Send + Sync,
{
    fn stat(&self) -> PoolStat {
        self()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
