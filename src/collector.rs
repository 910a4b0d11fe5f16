//! Pool collector — translates a `PoolStat` into Prometheus metric families.
//!
//! Registered once per pool. Descriptors are built at construction; every
//! scrape reads one fresh snapshot from the provider and emits one sample
//! per statistic. Nothing is cached between scrapes.

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::Result;
use crate::stats::{PoolStat, StatsProvider};

/// How Prometheus should interpret a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Counter,
    Gauge,
}

impl From<Kind> for MetricType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Counter => MetricType::COUNTER,
            Kind::Gauge => MetricType::GAUGE,
        }
    }
}

/// One exported pool statistic. The metric names are a stable public
/// surface: dashboards and alerts key on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    AcquireCount,
    AcquireDuration,
    AcquiredConns,
    CanceledAcquireCount,
    ConstructingConns,
    EmptyAcquireCount,
    IdleConns,
    MaxConns,
    TotalConns,
    NewConnsCount,
    MaxLifetimeDestroyCount,
    MaxIdleDestroyCount,
}

impl Statistic {
    /// Every statistic, in emission order.
    pub const ALL: [Statistic; 12] = [
        Statistic::AcquireCount,
        Statistic::AcquireDuration,
        Statistic::AcquiredConns,
        Statistic::CanceledAcquireCount,
        Statistic::ConstructingConns,
        Statistic::EmptyAcquireCount,
        Statistic::IdleConns,
        Statistic::MaxConns,
        Statistic::TotalConns,
        Statistic::NewConnsCount,
        Statistic::MaxLifetimeDestroyCount,
        Statistic::MaxIdleDestroyCount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Statistic::AcquireCount => "pgxpool_acquire_count",
            Statistic::AcquireDuration => "pgxpool_acquire_duration_ns",
            Statistic::AcquiredConns => "pgxpool_acquired_conns",
            Statistic::CanceledAcquireCount => "pgxpool_canceled_acquire_count",
            Statistic::ConstructingConns => "pgxpool_constructing_conns",
            Statistic::EmptyAcquireCount => "pgxpool_empty_acquire",
            Statistic::IdleConns => "pgxpool_idle_conns",
            Statistic::MaxConns => "pgxpool_max_conns",
            Statistic::TotalConns => "pgxpool_total_conns",
            Statistic::NewConnsCount => "pgxpool_new_conns_count",
            Statistic::MaxLifetimeDestroyCount => "pgxpool_max_lifetime_destroy_count",
            Statistic::MaxIdleDestroyCount => "pgxpool_max_idle_destroy_count",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Statistic::AcquireCount => "Cumulative count of successful acquires from the pool.",
            Statistic::AcquireDuration => {
                "Total duration of all successful acquires from the pool in nanoseconds."
            }
            Statistic::AcquiredConns => "Number of currently acquired connections in the pool.",
            Statistic::CanceledAcquireCount => {
                "Cumulative count of acquires from the pool that were canceled by a context."
            }
            Statistic::ConstructingConns => {
                "Number of conns with construction in progress in the pool."
            }
            Statistic::EmptyAcquireCount => {
                "Cumulative count of successful acquires from the pool that waited for a resource to be released or constructed because the pool was empty."
            }
            Statistic::IdleConns => "Number of currently idle conns in the pool.",
            Statistic::MaxConns => "Maximum size of the pool.",
            Statistic::TotalConns => {
                "Total number of resources currently in the pool. The value is the sum of ConstructingConns, AcquiredConns, and IdleConns."
            }
            Statistic::NewConnsCount => "Cumulative count of new connections opened.",
            Statistic::MaxLifetimeDestroyCount => {
                "Cumulative count of connections destroyed because they exceeded MaxConnLifetime."
            }
            Statistic::MaxIdleDestroyCount => {
                "Cumulative count of connections destroyed because they exceeded MaxConnIdleTime."
            }
        }
    }

    pub fn kind(self) -> Kind {
        match self {
            Statistic::AcquiredConns
            | Statistic::ConstructingConns
            | Statistic::IdleConns
            | Statistic::MaxConns
            | Statistic::TotalConns => Kind::Gauge,
            _ => Kind::Counter,
        }
    }

    /// Read this statistic out of a snapshot. No scaling beyond the
    /// duration-to-nanoseconds conversion.
    pub fn value(self, stat: &PoolStat) -> f64 {
        match self {
            Statistic::AcquireCount => stat.acquire_count as f64,
            Statistic::AcquireDuration => stat.acquire_duration.as_nanos() as f64,
            Statistic::AcquiredConns => f64::from(stat.acquired_conns),
            Statistic::CanceledAcquireCount => stat.canceled_acquire_count as f64,
            Statistic::ConstructingConns => f64::from(stat.constructing_conns),
            Statistic::EmptyAcquireCount => stat.empty_acquire_count as f64,
            Statistic::IdleConns => f64::from(stat.idle_conns),
            Statistic::MaxConns => f64::from(stat.max_conns),
            Statistic::TotalConns => f64::from(stat.total_conns),
            Statistic::NewConnsCount => stat.new_conns_count as f64,
            Statistic::MaxLifetimeDestroyCount => stat.max_lifetime_destroy_count as f64,
            Statistic::MaxIdleDestroyCount => stat.max_idle_destroy_count as f64,
        }
    }
}

/// A `prometheus::core::Collector` exposing the statistics of one pool.
///
/// `labels` are attached as const labels to every metric. Give each pool a
/// distinguishing label when several collectors share a registry, otherwise
/// the second registration is rejected as a duplicate.
pub struct StatsCollector {
    provider: Arc<dyn StatsProvider>,
    /// Index-aligned with `Statistic::ALL`.
    descs: Vec<Desc>,
}

impl StatsCollector {
    /// Build the descriptors for every statistic. Fails only when `labels`
    /// contains a name Prometheus does not accept.
    pub fn new(provider: Arc<dyn StatsProvider>, labels: HashMap<String, String>) -> Result<Self> {
        let descs = Statistic::ALL
            .iter()
            .map(|statistic| {
                Desc::new(
                    statistic.name().to_string(),
                    statistic.help().to_string(),
                    Vec::new(),
                    labels.clone(),
                )
            })
            .collect::<prometheus::Result<Vec<_>>>()?;

        debug!(labels = labels.len(), metrics = descs.len(), "pool collector created");
        Ok(Self { provider, descs })
    }

    /// Descriptors in `Statistic::ALL` order. Never touches the provider.
    pub fn descriptors(&self) -> &[Desc] {
        &self.descs
    }

    /// Build one metric family per statistic from `stat`.
    pub fn samples_from(&self, stat: &PoolStat) -> Vec<MetricFamily> {
        Statistic::ALL
            .iter()
            .zip(&self.descs)
            .map(|(statistic, desc)| {
                const_family(desc, statistic.kind(), statistic.value(stat))
            })
            .collect()
    }
}

impl Collector for StatsCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let stat = self.provider.stat();
        trace!(
            acquired = stat.acquired_conns,
            idle = stat.idle_conns,
            total = stat.total_conns,
            "pool stats collected"
        );
        self.samples_from(&stat)
    }
}

impl fmt::Debug for StatsCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsCollector")
            .field("descs", &self.descs)
            .finish_non_exhaustive()
    }
}

/// A single-sample family carrying the descriptor's name, help and const labels.
fn const_family(desc: &Desc, kind: Kind, value: f64) -> MetricFamily {
    let mut metric = proto::Metric::default();
    metric.set_label(desc.const_label_pairs.clone().into());
    match kind {
        Kind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(value);
            metric.set_counter(counter);
        }
        Kind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(value);
            metric.set_gauge(gauge);
        }
    }

    let mut family = MetricFamily::default();
    family.set_name(desc.fq_name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(kind.into());
    family.set_metric(vec![metric].into());
    family
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn sample_stat() -> PoolStat {
        PoolStat {
            acquire_count: 1,
            acquire_duration: Duration::from_secs(2),
            acquired_conns: 3,
            canceled_acquire_count: 4,
            constructing_conns: 5,
            empty_acquire_count: 6,
            idle_conns: 7,
            max_conns: 8,
            total_conns: 9,
            new_conns_count: 10,
            max_lifetime_destroy_count: 11,
            max_idle_destroy_count: 12,
        }
    }

    fn make_collector(stat: PoolStat, labels: &[(&str, &str)]) -> StatsCollector {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StatsCollector::new(Arc::new(move || stat), labels).unwrap()
    }

    fn value_of(family: &MetricFamily) -> f64 {
        let metric = &family.get_metric()[0];
        match family.get_field_type() {
            MetricType::COUNTER => metric.get_counter().get_value(),
            MetricType::GAUGE => metric.get_gauge().get_value(),
            other => panic!("unexpected metric type {other:?}"),
        }
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = Statistic::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), Statistic::ALL.len());
    }

    #[test]
    fn test_describe_all_stats_with_labels() {
        let collector = make_collector(PoolStat::default(), &[("testLabel", "testLabelValue")]);
        let descs = collector.desc();
        assert_eq!(descs.len(), 12);

        let mut unique = HashSet::new();
        for desc in descs {
            let text = format!("{desc:?}");
            assert!(text.contains("testLabel"), "missing label name: {text}");
            assert!(text.contains("testLabelValue"), "missing label value: {text}");
            assert_eq!(desc.const_label_pairs.len(), 1);
            assert_eq!(desc.const_label_pairs[0].get_name(), "testLabel");
            assert_eq!(desc.const_label_pairs[0].get_value(), "testLabelValue");
            unique.insert(desc.fq_name.clone());
        }
        assert_eq!(unique.len(), 12);
    }

    #[test]
    fn test_describe_does_not_call_provider() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let collector = StatsCollector::new(
            Arc::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
                PoolStat::default()
            }),
            HashMap::new(),
        )
        .unwrap();

        assert_eq!(collector.desc().len(), 12);
        assert_eq!(collector.descriptors().len(), 12);
        assert_eq!(calls.load(Ordering::Relaxed), 0);

        collector.collect();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unlabeled_collector() {
        let collector = make_collector(PoolStat::default(), &[]);
        for desc in collector.desc() {
            assert!(desc.const_label_pairs.is_empty());
        }
        for family in collector.collect() {
            assert!(family.get_metric()[0].get_label().is_empty());
        }
    }

    #[test]
    fn test_pool_label_in_every_descriptor() {
        let collector = make_collector(PoolStat::default(), &[("pool", "primary")]);
        for desc in collector.desc() {
            let text = format!("{desc:?}");
            assert!(text.contains("pool"));
            assert!(text.contains("primary"));
        }
    }

    #[test]
    fn test_collect_all_stats() {
        let collector = make_collector(sample_stat(), &[]);
        let families = collector.collect();
        assert_eq!(families.len(), 12);

        let expected: HashMap<&str, (f64, MetricType)> = [
            ("pgxpool_acquire_count", (1.0, MetricType::COUNTER)),
            ("pgxpool_acquire_duration_ns", (2e9, MetricType::COUNTER)),
            ("pgxpool_acquired_conns", (3.0, MetricType::GAUGE)),
            ("pgxpool_canceled_acquire_count", (4.0, MetricType::COUNTER)),
            ("pgxpool_constructing_conns", (5.0, MetricType::GAUGE)),
            ("pgxpool_empty_acquire", (6.0, MetricType::COUNTER)),
            ("pgxpool_idle_conns", (7.0, MetricType::GAUGE)),
            ("pgxpool_max_conns", (8.0, MetricType::GAUGE)),
            ("pgxpool_total_conns", (9.0, MetricType::GAUGE)),
            ("pgxpool_new_conns_count", (10.0, MetricType::COUNTER)),
            ("pgxpool_max_lifetime_destroy_count", (11.0, MetricType::COUNTER)),
            ("pgxpool_max_idle_destroy_count", (12.0, MetricType::COUNTER)),
        ]
        .into_iter()
        .collect();

        for family in &families {
            let (value, kind) = expected
                .get(family.get_name())
                .unwrap_or_else(|| panic!("unexpected metric {}", family.get_name()));
            assert_eq!(family.get_field_type(), *kind, "{}", family.get_name());
            assert_eq!(family.get_metric().len(), 1);
            assert_eq!(value_of(family), *value, "{}", family.get_name());
        }
    }

    #[test]
    fn test_collect_zero_snapshot() {
        let collector = make_collector(PoolStat::default(), &[]);
        let families = collector.collect();
        assert_eq!(families.len(), 12);
        for family in &families {
            assert_eq!(value_of(family), 0.0, "{}", family.get_name());
        }
    }

    #[test]
    fn test_collect_has_no_carried_state() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let collector = StatsCollector::new(
            Arc::new(move || {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                if n == 0 {
                    sample_stat()
                } else {
                    PoolStat {
                        idle_conns: 42,
                        ..PoolStat::default()
                    }
                }
            }),
            HashMap::new(),
        )
        .unwrap();

        let first = collector.collect();
        let second = collector.collect();

        let idle = |families: &[MetricFamily]| {
            families
                .iter()
                .find(|f| f.get_name() == "pgxpool_idle_conns")
                .map(value_of)
        };
        let acquires = |families: &[MetricFamily]| {
            families
                .iter()
                .find(|f| f.get_name() == "pgxpool_acquire_count")
                .map(value_of)
        };
        assert_eq!(idle(&first), Some(7.0));
        assert_eq!(acquires(&first), Some(1.0));
        assert_eq!(idle(&second), Some(42.0));
        assert_eq!(acquires(&second), Some(0.0));
    }

    #[test]
    fn test_samples_carry_const_labels() {
        let collector = make_collector(sample_stat(), &[("pool", "replica"), ("db", "orders")]);
        for family in collector.samples_from(&sample_stat()) {
            let labels = family.get_metric()[0].get_label();
            assert_eq!(labels.len(), 2);
            let pairs: HashMap<_, _> = labels
                .iter()
                .map(|l| (l.get_name(), l.get_value()))
                .collect();
            assert_eq!(pairs.get("pool"), Some(&"replica"));
            assert_eq!(pairs.get("db"), Some(&"orders"));
        }
    }

    #[test]
    fn test_sub_second_duration_in_nanos() {
        let stat = PoolStat {
            acquire_duration: Duration::from_nanos(1_500),
            ..PoolStat::default()
        };
        assert_eq!(Statistic::AcquireDuration.value(&stat), 1_500.0);
    }

    #[test]
    fn test_invalid_label_name_rejected() {
        let labels = HashMap::from([("bad-label".to_string(), "x".to_string())]);
        let result = StatsCollector::new(Arc::new(PoolStat::default), labels);
        assert!(result.is_err());
    }

    #[test]
    #[should_panic(expected = "pool stats unavailable")]
    fn test_collect_propagates_provider_panic() {
        let collector = StatsCollector::new(
            Arc::new(|| -> PoolStat { panic!("pool stats unavailable") }),
            HashMap::new(),
        )
        .unwrap();
        collector.collect();
    }

    #[test]
    fn test_concurrent_desc_and_collect() {
        let collector = make_collector(sample_stat(), &[("pool", "primary")]);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..200 {
                        assert_eq!(collector.desc().len(), 12);
                        let families = collector.collect();
                        assert_eq!(families.len(), 12);
                        let total = families
                            .iter()
                            .find(|f| f.get_name() == "pgxpool_total_conns")
                            .map(value_of);
                        assert_eq!(total, Some(9.0));
                    }
                });
            }
        });
    }

    #[test]
    fn test_kinds() {
        let gauges: Vec<_> = Statistic::ALL
            .iter()
            .filter(|s| s.kind() == Kind::Gauge)
            .map(|s| s.name())
            .collect();
        assert_eq!(
            gauges,
            vec![
                "pgxpool_acquired_conns",
                "pgxpool_constructing_conns",
                "pgxpool_idle_conns",
                "pgxpool_max_conns",
                "pgxpool_total_conns",
            ]
        );
    }
}
