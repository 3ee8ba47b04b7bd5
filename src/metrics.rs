//! Metric sinks, labels and the fixed metric layout.

use std::time::Duration;

use crate::breaker::ObservableBreaker;
use crate::event::BreakerEvent;

/// Names of the metrics the bridge registers, before any prefix.
///
/// Counters are registered under their base name; text exposition appends
/// `_total`.
pub mod names {
    /// Execution attempts.
    pub const EXECUTE: &str = "breaker_execute";
    /// Successful executions.
    pub const SUCCESS: &str = "breaker_success";
    /// Failed executions.
    pub const FAILURE: &str = "breaker_failure";
    /// Timed out executions.
    pub const TIMEOUT: &str = "breaker_timeout";
    /// Executions rejected by the health check.
    pub const REJECT: &str = "breaker_reject";
    /// Circuit close transitions.
    pub const CIRCUIT_CLOSED: &str = "breaker_circuit_closed";
    /// Circuit open transitions.
    pub const CIRCUIT_OPENED: &str = "breaker_circuit_opened";
    /// Execution duration quantiles.
    pub const DURATION_SUMMARY: &str = "breaker_duration_seconds";
    /// Execution duration buckets.
    pub const DURATION_HISTOGRAM: &str = "breaker_duration_buckets_seconds";

    /// Every registered name, in registration order.
    pub const ALL: [&str; 9] = [
        EXECUTE,
        SUCCESS,
        FAILURE,
        TIMEOUT,
        REJECT,
        CIRCUIT_CLOSED,
        CIRCUIT_OPENED,
        DURATION_SUMMARY,
        DURATION_HISTOGRAM,
    ];
}

/// Quantiles tracked by the duration summary.
pub const DURATION_PERCENTILES: [f64; 9] = [0.0, 0.25, 0.5, 0.75, 0.9, 0.95, 0.99, 0.995, 1.0];

/// Upper bound of the first duration bucket, in seconds.
pub const DURATION_BUCKET_START: f64 = 0.001;

/// Growth factor between consecutive duration buckets.
pub const DURATION_BUCKET_FACTOR: f64 = 1.5;

/// Number of bounded duration buckets.
pub const DURATION_BUCKET_COUNT: u16 = 20;

/// Decimal places each bucket bound is rounded to.
pub const DURATION_BUCKET_PRECISION: i32 = 4;

/// Bounded duration bucket upper bounds, in seconds.
///
/// The histogram appends the unbounded `+Inf` bucket after these.
pub fn duration_buckets() -> impl Iterator<Item = f64> {
    let scale = 10f64.powi(DURATION_BUCKET_PRECISION);
    (0..DURATION_BUCKET_COUNT).map(move |i| {
        let bound = DURATION_BUCKET_START * DURATION_BUCKET_FACTOR.powi(i32::from(i));
        (bound * scale).round() / scale
    })
}

/// The label tuple every metric mutation carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "prometheus",
    derive(prometheus_client::encoding::EncodeLabelSet)
)]
pub struct BreakerLabels {
    breaker_name: String,
    breaker_group: String,
}

impl BreakerLabels {
    /// Creates labels for a breaker name and optional group.
    ///
    /// A missing group is encoded as an empty label value.
    pub fn new(name: impl Into<String>, group: Option<&str>) -> Self {
        Self {
            breaker_name: name.into(),
            breaker_group: group.unwrap_or_default().to_string(),
        }
    }

    /// Derives the labels of a breaker.
    pub fn of<B: ObservableBreaker + ?Sized>(breaker: &B) -> Self {
        Self::new(breaker.name(), breaker.group())
    }

    /// Gets the breaker name.
    pub fn name(&self) -> &str {
        &self.breaker_name
    }

    /// Gets the breaker group.
    pub fn group(&self) -> Option<&str> {
        if self.breaker_group.is_empty() {
            None
        } else {
            Some(&self.breaker_group)
        }
    }
}

/// Trait for metrics sinks that can receive circuit breaker events.
pub trait MetricSink: Send + Sync + 'static {
    /// Records an execution attempt.
    fn record_execution(&self, labels: &BreakerLabels);

    /// Records a successful execution.
    fn record_success(&self, labels: &BreakerLabels, duration: Duration);

    /// Records a failed execution.
    fn record_failure(&self, labels: &BreakerLabels, duration: Duration);

    /// Records a timed out execution.
    fn record_timeout(&self, labels: &BreakerLabels, duration: Duration);

    /// Records a health check rejection.
    fn record_rejection(&self, labels: &BreakerLabels);

    /// Records the circuit closing.
    fn record_circuit_closed(&self, labels: &BreakerLabels);

    /// Records the circuit opening.
    fn record_circuit_opened(&self, labels: &BreakerLabels);

    /// Records any breaker event.
    fn record(&self, labels: &BreakerLabels, event: &BreakerEvent) {
        match *event {
            BreakerEvent::Exec => self.record_execution(labels),
            BreakerEvent::Success(d) => self.record_success(labels, d),
            BreakerEvent::Failure(d) => self.record_failure(labels, d),
            BreakerEvent::Timeout(d) => self.record_timeout(labels, d),
            BreakerEvent::HealthCheckFailed => self.record_rejection(labels),
            BreakerEvent::CircuitClosed => self.record_circuit_closed(labels),
            BreakerEvent::CircuitOpen => self.record_circuit_opened(labels),
        }
    }
}

/// A null metrics sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricSink;

impl MetricSink for NullMetricSink {
    fn record_execution(&self, _labels: &BreakerLabels) {}
    fn record_success(&self, _labels: &BreakerLabels, _duration: Duration) {}
    fn record_failure(&self, _labels: &BreakerLabels, _duration: Duration) {}
    fn record_timeout(&self, _labels: &BreakerLabels, _duration: Duration) {}
    fn record_rejection(&self, _labels: &BreakerLabels) {}
    fn record_circuit_closed(&self, _labels: &BreakerLabels) {}
    fn record_circuit_opened(&self, _labels: &BreakerLabels) {}
}
