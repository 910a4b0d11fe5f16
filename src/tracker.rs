//! Stats tracker — atomic pool counters for pools without their own stats.
//!
//! Wrapped in `Arc<StatsTracker>` and shared between the pool (which records
//! events) and the collector (which reads a `PoolStat` at scrape time).
//! Every counter is lock-free; a snapshot is a handful of relaxed loads.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crate::stats::{PoolStat, StatsProvider};

/// Why an idle connection was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// Connection outlived the pool's max lifetime.
    MaxLifetime,
    /// Connection sat idle longer than the pool's idle timeout.
    MaxIdle,
    /// Health check failure, pool shrink, shutdown.
    Other,
}

/// Pool event counters, all lock-free.
#[derive(Debug)]
pub struct StatsTracker {
    max_conns: AtomicU32,

    // ─── Current connections ─────────────────────────────────────────────
    acquired_conns: AtomicU32,
    constructing_conns: AtomicU32,
    idle_conns: AtomicU32,

    // ─── Cumulative ──────────────────────────────────────────────────────
    acquire_count: AtomicU64,
    acquire_duration_ns: AtomicU64,
    canceled_acquire_count: AtomicU64,
    empty_acquire_count: AtomicU64,
    new_conns_count: AtomicU64,
    max_lifetime_destroy_count: AtomicU64,
    max_idle_destroy_count: AtomicU64,
}

impl StatsTracker {
    /// Create a tracker with zeroed counters for a pool of `max_conns`.
    pub fn new(max_conns: u32) -> Self {
        Self {
            max_conns: AtomicU32::new(max_conns),
            acquired_conns: AtomicU32::new(0),
            constructing_conns: AtomicU32::new(0),
            idle_conns: AtomicU32::new(0),
            acquire_count: AtomicU64::new(0),
            acquire_duration_ns: AtomicU64::new(0),
            canceled_acquire_count: AtomicU64::new(0),
            empty_acquire_count: AtomicU64::new(0),
            new_conns_count: AtomicU64::new(0),
            max_lifetime_destroy_count: AtomicU64::new(0),
            max_idle_destroy_count: AtomicU64::new(0),
        }
    }

    pub fn set_max_conns(&self, max_conns: u32) {
        self.max_conns.store(max_conns, Ordering::Relaxed);
    }

    /// A new connection started its handshake.
    pub fn begin_construct(&self) {
        inc(&self.constructing_conns);
    }

    /// A connection finished its handshake and joined the idle set.
    pub fn construct_succeeded(&self) {
        transfer(&self.constructing_conns, &self.idle_conns);
        self.new_conns_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn construct_failed(&self) {
        dec(&self.constructing_conns);
    }

    /// An idle connection was handed to a caller after waiting `wait`.
    /// `waited_for_empty` marks acquires that found no idle connection and
    /// had to wait for one to be released or constructed.
    ///
    /// Cumulative counters always record the event; connection counts only
    /// move when there was an idle connection to move.
    pub fn acquired(&self, wait: Duration, waited_for_empty: bool) {
        self.acquire_count.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(wait.as_nanos()).unwrap_or(u64::MAX);
        self.acquire_duration_ns.fetch_add(nanos, Ordering::Relaxed);
        if waited_for_empty {
            self.empty_acquire_count.fetch_add(1, Ordering::Relaxed);
        }
        transfer(&self.idle_conns, &self.acquired_conns);
    }

    /// The caller gave up (timeout, cancellation) before a connection arrived.
    pub fn acquire_canceled(&self) {
        self.canceled_acquire_count.fetch_add(1, Ordering::Relaxed);
    }

    /// A checked-out connection went back to the idle set.
    pub fn released(&self) {
        transfer(&self.acquired_conns, &self.idle_conns);
    }

    /// A checked-out connection was closed instead of being returned.
    pub fn discard_acquired(&self) {
        dec(&self.acquired_conns);
    }

    /// An idle connection was closed by the pool.
    pub fn destroy_idle(&self, reason: DestroyReason) {
        dec(&self.idle_conns);
        match reason {
            DestroyReason::MaxLifetime => {
                self.max_lifetime_destroy_count.fetch_add(1, Ordering::Relaxed);
            }
            DestroyReason::MaxIdle => {
                self.max_idle_destroy_count.fetch_add(1, Ordering::Relaxed);
            }
            DestroyReason::Other => {}
        }
    }

    /// Read every counter. Counts are loaded independently, so a snapshot
    /// taken during heavy churn may be off by in-flight transitions.
    pub fn snapshot(&self) -> PoolStat {
        let acquired_conns = self.acquired_conns.load(Ordering::Relaxed);
        let constructing_conns = self.constructing_conns.load(Ordering::Relaxed);
        let idle_conns = self.idle_conns.load(Ordering::Relaxed);

        PoolStat {
            acquire_count: self.acquire_count.load(Ordering::Relaxed),
            acquire_duration: Duration::from_nanos(
                self.acquire_duration_ns.load(Ordering::Relaxed),
            ),
            acquired_conns,
            canceled_acquire_count: self.canceled_acquire_count.load(Ordering::Relaxed),
            constructing_conns,
            empty_acquire_count: self.empty_acquire_count.load(Ordering::Relaxed),
            idle_conns,
            max_conns: self.max_conns.load(Ordering::Relaxed),
            total_conns: acquired_conns
                .saturating_add(constructing_conns)
                .saturating_add(idle_conns),
            new_conns_count: self.new_conns_count.load(Ordering::Relaxed),
            max_lifetime_destroy_count: self.max_lifetime_destroy_count.load(Ordering::Relaxed),
            max_idle_destroy_count: self.max_idle_destroy_count.load(Ordering::Relaxed),
        }
    }
}

impl StatsProvider for StatsTracker {
    fn stat(&self) -> PoolStat {
        self.snapshot()
    }
}

#[inline]
fn inc(gauge: &AtomicU32) {
    gauge.fetch_add(1, Ordering::Relaxed);
}

/// Decrement a connection count, saturating at zero. Returns false when the
/// count was already zero.
#[inline]
fn dec(gauge: &AtomicU32) -> bool {
    gauge
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1))
        .is_ok()
}

/// Move one connection from `from` to `to`. Nothing moves when `from` is empty.
#[inline]
fn transfer(from: &AtomicU32, to: &AtomicU32) {
    if dec(from) {
        inc(to);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
