//! Prometheus-backed metric sink.

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Metric;
use std::time::Duration;
use tracing::debug;

use crate::config::BridgeOptions;
use crate::error::BridgeResult;
use crate::event::EventKind;
use crate::metrics::{duration_buckets, names, BreakerLabels, MetricSink, DURATION_PERCENTILES};
use crate::registry::{MetricEntry, MetricsRegistry};
use crate::summary::{Summary, SummarySnapshot};

type CounterFamily = Family<BreakerLabels, Counter>;
type HistogramFamily = Family<BreakerLabels, Histogram>;

/// The fixed set of breaker metrics, shared by every breaker a bridge binds.
///
/// All families are created empty: a label tuple only appears in exposition
/// once its breaker has emitted the corresponding event.
#[derive(Debug, Clone)]
pub struct BreakerMetrics {
    execute: CounterFamily,
    success: CounterFamily,
    failure: CounterFamily,
    timeout: CounterFamily,
    rejected: CounterFamily,
    circuit_closed: CounterFamily,
    circuit_opened: CounterFamily,
    duration_summary: Summary,
    duration_histogram: HistogramFamily,
}

impl BreakerMetrics {
    /// Creates unregistered metrics.
    pub fn new(options: &BridgeOptions) -> Self {
        Self {
            execute: CounterFamily::default(),
            success: CounterFamily::default(),
            failure: CounterFamily::default(),
            timeout: CounterFamily::default(),
            rejected: CounterFamily::default(),
            circuit_closed: CounterFamily::default(),
            circuit_opened: CounterFamily::default(),
            duration_summary: Summary::new(&DURATION_PERCENTILES, options.summary.clone()),
            duration_histogram: HistogramFamily::new_with_constructor(|| {
                Histogram::new(duration_buckets())
            }),
        }
    }

    /// Creates the metrics and registers them, prefixed, in a registry.
    ///
    /// Registration is all or nothing: if any name is already taken the
    /// registry is left untouched.
    pub fn register(registry: &MetricsRegistry, options: &BridgeOptions) -> BridgeResult<Self> {
        let metrics = Self::new(options);
        let counters = [
            (names::EXECUTE, "Resolver circuit breaker execute count", &metrics.execute),
            (names::SUCCESS, "Resolver circuit breaker success count", &metrics.success),
            (names::FAILURE, "Resolver circuit breaker failure count", &metrics.failure),
            (names::TIMEOUT, "Resolver circuit breaker timeout count", &metrics.timeout),
            (names::REJECT, "Resolver circuit breaker reject count", &metrics.rejected),
            (
                names::CIRCUIT_CLOSED,
                "Resolver circuit breaker circuit closed count",
                &metrics.circuit_closed,
            ),
            (
                names::CIRCUIT_OPENED,
                "Resolver circuit breaker circuit opened count",
                &metrics.circuit_opened,
            ),
        ];

        let mut entries: Vec<MetricEntry> = counters
            .into_iter()
            .map(|(name, help, family)| {
                let metric: Box<dyn Metric> = Box::new(family.clone());
                (options.metric_name(name), help.to_string(), metric)
            })
            .collect();
        entries.push((
            options.metric_name(names::DURATION_SUMMARY),
            "Resolver circuit breaker duration summary".to_string(),
            Box::new(metrics.duration_summary.clone()),
        ));
        entries.push((
            options.metric_name(names::DURATION_HISTOGRAM),
            "Resolver circuit breaker duration buckets".to_string(),
            Box::new(metrics.duration_histogram.clone()),
        ));
        registry.register_all(entries)?;

        debug!(prefix = %options.prefix, metrics = names::ALL.len(), "registered breaker metrics");
        Ok(metrics)
    }

    /// Gets the counter family for an event kind.
    ///
    /// Every kind has a counter; success, failure and timeout additionally
    /// feed the duration metrics.
    pub fn counter(&self, kind: EventKind) -> &Family<BreakerLabels, Counter> {
        match kind {
            EventKind::Exec => &self.execute,
            EventKind::Success => &self.success,
            EventKind::Failure => &self.failure,
            EventKind::Timeout => &self.timeout,
            EventKind::HealthCheckFailed => &self.rejected,
            EventKind::CircuitClosed => &self.circuit_closed,
            EventKind::CircuitOpen => &self.circuit_opened,
        }
    }

    /// Gets the duration summary.
    pub fn duration_summary(&self) -> &Summary {
        &self.duration_summary
    }

    /// Gets the duration summary state of one breaker.
    pub fn duration_snapshot(&self, labels: &BreakerLabels) -> Option<SummarySnapshot> {
        self.duration_summary.snapshot(labels)
    }

    /// Gets the duration histogram family.
    pub fn duration_histogram(&self) -> &Family<BreakerLabels, Histogram> {
        &self.duration_histogram
    }

    fn observe_duration(&self, labels: &BreakerLabels, duration: Duration) {
        let secs = duration.as_secs_f64();
        self.duration_summary.observe(labels, secs);
        self.duration_histogram.get_or_create(labels).observe(secs);
    }
}

impl MetricSink for BreakerMetrics {
    fn record_execution(&self, labels: &BreakerLabels) {
        self.execute.get_or_create(labels).inc();
    }

    fn record_success(&self, labels: &BreakerLabels, duration: Duration) {
        self.success.get_or_create(labels).inc();
        self.observe_duration(labels, duration);
    }

    fn record_failure(&self, labels: &BreakerLabels, duration: Duration) {
        self.failure.get_or_create(labels).inc();
        self.observe_duration(labels, duration);
    }

    fn record_timeout(&self, labels: &BreakerLabels, duration: Duration) {
        self.timeout.get_or_create(labels).inc();
        self.observe_duration(labels, duration);
    }

    fn record_rejection(&self, labels: &BreakerLabels) {
        self.rejected.get_or_create(labels).inc();
    }

    fn record_circuit_closed(&self, labels: &BreakerLabels) {
        self.circuit_closed.get_or_create(labels).inc();
    }

    fn record_circuit_opened(&self, labels: &BreakerLabels) {
        self.circuit_opened.get_or_create(labels).inc();
    }
}
