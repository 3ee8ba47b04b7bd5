//! # circuitbreaker-metrics
//!
//! An observability bridge that republishes circuit breaker lifecycle events
//! as Prometheus metrics.
//!
//! The breaker itself (its state machine, health checks and timeouts) lives
//! elsewhere. This crate subscribes to the events a breaker emits and turns
//! each one into a counter increment or a duration observation labelled with
//! the breaker's name and group.
//!
//! ## Metrics
//!
//! | name                               | type      | fed by |
//! |------------------------------------|-----------|--------|
//! | `breaker_execute_total`            | counter   | `exec` |
//! | `breaker_success_total`            | counter   | `success` |
//! | `breaker_failure_total`            | counter   | `failure` |
//! | `breaker_timeout_total`            | counter   | `timeout` |
//! | `breaker_reject_total`             | counter   | `healthCheckFailed` |
//! | `breaker_circuit_closed_total`     | counter   | `circuitClosed` |
//! | `breaker_circuit_opened_total`     | counter   | `circuitOpen` |
//! | `breaker_duration_seconds`         | gauge     | `success`, `failure`, `timeout` |
//! | `breaker_duration_buckets_seconds` | histogram | `success`, `failure`, `timeout` |
//!
//! Durations are recorded in seconds. The histogram uses 20 exponential
//! buckets from 1ms with factor 1.5, rounded to four decimals, plus `+Inf`.
//! The summary tracks the 0, 0.25, 0.5, 0.75, 0.9, 0.95, 0.99, 0.995 and 1
//! quantiles.
//!
//! prometheus-client has no summary type, so `breaker_duration_seconds` is
//! exposed as a gauge with a `quantile` label and no `_sum` or `_count`
//! samples. Scrapers should read sum and count from
//! `breaker_duration_buckets_seconds_sum` and `_count`, which record the same
//! observations.
//!
//! ## Basic Usage
//!
//! ```rust
//! use circuitbreaker_metrics::{BreakerEvent, BreakerHandle, EventBridge, MetricsRegistry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let registry = Arc::new(MetricsRegistry::new());
//! let bridge = EventBridge::builder()
//!     .registry(Arc::clone(&registry))
//!     .build()
//!     .expect("valid configuration");
//!
//! // Whatever drives the breaker emits through its handle
//! let breaker = BreakerHandle::new("user-service").with_group("backends");
//! bridge.bind(&breaker).expect("metrics registered");
//!
//! breaker.emit(BreakerEvent::Exec);
//! breaker.emit(BreakerEvent::Success(Duration::from_millis(42)));
//!
//! let exposition = registry.encode().expect("encodable registry");
//! assert!(exposition.contains("breaker_success_total"));
//! ```
//!
//! ## Degraded Mode
//!
//! A bridge without a metrics backend accepts binds, logs that nothing will
//! be recorded and returns `None`:
//!
//! ```rust
//! use circuitbreaker_metrics::{BreakerHandle, EventBridge};
//!
//! let bridge = EventBridge::disabled();
//! let breaker = BreakerHandle::new("user-service");
//! assert!(bridge.bind(&breaker).unwrap().is_none());
//! ```
//!
//! ## Features
//!
//! - `prometheus` - Prometheus metrics through `prometheus-client` (default)

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod bridge;
mod config;
mod error;
mod event;
mod hook;
mod metrics;
pub mod prelude;
#[cfg(feature = "prometheus")]
mod prometheus;
#[cfg(feature = "prometheus")]
mod registry;
#[cfg(feature = "prometheus")]
mod summary;

// Re-exports
pub use breaker::{BreakerHandle, ObservableBreaker};
pub use bridge::EventBridge;
pub use config::{BridgeBuilder, BridgeOptions, DuplicatePolicy, SummaryOptions};
pub use error::{BridgeError, BridgeResult};
pub use event::{BreakerEvent, EventKind};
pub use hook::{EventHandler, HookRegistry, SubscriptionId};
pub use metrics::{
    duration_buckets, names, BreakerLabels, MetricSink, NullMetricSink, DURATION_BUCKET_COUNT,
    DURATION_BUCKET_FACTOR, DURATION_BUCKET_PRECISION, DURATION_BUCKET_START,
    DURATION_PERCENTILES,
};
#[cfg(feature = "prometheus")]
pub use prometheus::BreakerMetrics;
#[cfg(feature = "prometheus")]
pub use registry::{MetricEntry, MetricsRegistry};
#[cfg(feature = "prometheus")]
pub use summary::{Summary, SummarySnapshot};
