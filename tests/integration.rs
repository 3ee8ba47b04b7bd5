#![cfg(feature = "prometheus")]

mod common;

use circuitbreaker_metrics::{
    names, BreakerEvent, BreakerHandle, BreakerLabels, BridgeError, DuplicatePolicy, EventBridge,
    EventKind, MetricEntry, MetricSink, MetricsRegistry, NullMetricSink, DURATION_PERCENTILES,
};
use common::{sample, sample_count, StubBreaker, TestError};
use parking_lot::Mutex;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::registry::Metric;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn bridge_with_registry() -> (EventBridge, Arc<MetricsRegistry>) {
    let registry = Arc::new(MetricsRegistry::new());
    let bridge = EventBridge::builder()
        .registry(Arc::clone(&registry))
        .build()
        .unwrap();
    (bridge, registry)
}

#[test]
fn test_bind_registers_metric_set() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = StubBreaker::new("some-name");

    assert!(registry.is_empty());

    bridge.bind(&breaker).unwrap();

    assert_eq!(registry.len(), 9);
    assert_eq!(registry.metric_names(), names::ALL.to_vec());
    assert!(bridge.metrics().is_some());
}

#[test]
fn test_no_samples_before_events() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = StubBreaker::new("some-name");

    bridge.bind(&breaker).unwrap();

    let exposition = registry.encode().unwrap();
    assert_eq!(sample_count(&exposition), 0);
}

#[test]
fn test_execution_counted_with_labels() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = StubBreaker::with_group("some-name", "defaultBrakeGroup");

    bridge.bind(&breaker).unwrap();
    breaker.exec(|| Ok(())).unwrap();

    let exposition = registry.encode().unwrap();
    assert_eq!(
        sample(
            &exposition,
            "breaker_execute_total",
            &[("breaker_name", "some-name"), ("breaker_group", "defaultBrakeGroup")]
        ),
        Some(1.0)
    );
    assert_eq!(
        sample(&exposition, "breaker_success_total", &[("breaker_name", "some-name")]),
        Some(1.0)
    );

    let labels = BreakerLabels::of(&breaker);
    let metrics = bridge.metrics().unwrap();
    assert_eq!(labels.group(), Some("defaultBrakeGroup"));
    assert_eq!(metrics.counter(EventKind::Exec).get_or_create(&labels).get(), 1);
}

#[test]
fn test_durations_recorded_in_seconds() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = StubBreaker::new("slow");

    bridge.bind(&breaker).unwrap();
    breaker
        .exec(|| {
            thread::sleep(Duration::from_millis(250));
            Ok(())
        })
        .unwrap();

    let exposition = registry.encode().unwrap();
    let sum = sample(
        &exposition,
        "breaker_duration_buckets_seconds_sum",
        &[("breaker_name", "slow")],
    )
    .unwrap();
    assert!(sum >= 0.25 && sum < 0.275, "unexpected duration sum {}", sum);

    let median = sample(
        &exposition,
        "breaker_duration_seconds",
        &[("breaker_name", "slow"), ("quantile", "0.5")],
    )
    .unwrap();
    assert!(median >= 0.25 && median < 0.275, "unexpected median {}", median);

    let snapshot = bridge
        .metrics()
        .unwrap()
        .duration_snapshot(&BreakerLabels::of(&breaker))
        .unwrap();
    assert_eq!(snapshot.count, 1);
    assert!(snapshot.sum >= 0.25 && snapshot.sum < 0.275);
    assert_eq!(snapshot.quantiles.len(), DURATION_PERCENTILES.len());
}

#[test]
fn test_failure_counted() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = StubBreaker::new("failing");

    bridge.bind(&breaker).unwrap();
    let result = breaker.exec(|| -> Result<(), TestError> { Err(TestError::new("error")) });
    assert!(result.is_err());

    let exposition = registry.encode().unwrap();
    let labels = [("breaker_name", "failing")];
    assert_eq!(sample(&exposition, "breaker_failure_total", &labels), Some(1.0));
    assert_eq!(sample(&exposition, "breaker_success_total", &labels), None);
    assert_eq!(sample(&exposition, "breaker_timeout_total", &labels), None);
    assert_eq!(
        sample(&exposition, "breaker_duration_buckets_seconds_count", &labels),
        Some(1.0)
    );
}

#[test]
fn test_timeout_counted() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = StubBreaker::new("sluggish").with_timeout(Duration::from_millis(10));

    bridge.bind(&breaker).unwrap();
    let result = breaker.exec(|| {
        thread::sleep(Duration::from_millis(20));
        Ok(())
    });
    assert!(result.is_err());

    let exposition = registry.encode().unwrap();
    let labels = [("breaker_name", "sluggish")];
    assert_eq!(sample(&exposition, "breaker_timeout_total", &labels), Some(1.0));
    assert_eq!(sample(&exposition, "breaker_success_total", &labels), None);
    assert_eq!(sample(&exposition, "breaker_failure_total", &labels), None);
}

#[test]
fn test_state_events_counted() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = StubBreaker::new("flappy");

    bridge.bind(&breaker).unwrap();
    breaker.open();
    breaker.reject();
    breaker.reject();
    breaker.close();

    let exposition = registry.encode().unwrap();
    let labels = [("breaker_name", "flappy")];
    assert_eq!(sample(&exposition, "breaker_circuit_opened_total", &labels), Some(1.0));
    assert_eq!(sample(&exposition, "breaker_reject_total", &labels), Some(2.0));
    assert_eq!(sample(&exposition, "breaker_circuit_closed_total", &labels), Some(1.0));
    assert_eq!(sample(&exposition, "breaker_execute_total", &labels), None);
}

#[test]
fn test_bind_returns_same_breaker() {
    let (bridge, _registry) = bridge_with_registry();
    let breaker = StubBreaker::new("some-name");

    let bound = bridge.bind(&breaker).unwrap().unwrap();

    assert!(std::ptr::eq(bound, &breaker));
}

#[test]
fn test_prefix_applied_to_every_metric() {
    let registry = Arc::new(MetricsRegistry::new());
    let bridge = EventBridge::builder()
        .registry(Arc::clone(&registry))
        .prefix("some_prefix_")
        .build()
        .unwrap();

    bridge.bind(&StubBreaker::new("some-name")).unwrap();

    let metric_names = registry.metric_names();
    assert_eq!(metric_names.len(), 9);
    assert!(metric_names.iter().all(|name| name.starts_with("some_prefix_")));
}

#[test]
fn test_invalid_prefix_rejected() {
    let result = EventBridge::builder().prefix("1-bad").build();

    assert!(matches!(result, Err(BridgeError::InvalidConfig(_))));
}

#[test]
fn test_disabled_bridge_is_noop() {
    let bridge = EventBridge::disabled();
    let breaker = StubBreaker::new("some-name");

    assert!(bridge.bind(&breaker).unwrap().is_none());
    assert!(!bridge.is_enabled());
    assert_eq!(bridge.binding_count(), 0);
    assert_eq!(breaker.handler_count(EventKind::Exec), 0);
    assert!(bridge.registry().is_none());
}

#[test]
fn test_null_sink_binds_without_recording() {
    let bridge = EventBridge::builder().sink(NullMetricSink).build().unwrap();
    let breaker = StubBreaker::new("null");

    assert!(bridge.bind(&breaker).unwrap().is_some());
    assert_eq!(breaker.handler_count(EventKind::Success), 1);
    breaker.exec(|| Ok(())).unwrap();

    assert!(bridge.is_enabled());
    assert!(bridge.registry().is_none());
    assert!(bridge.metrics().is_none());
}

#[test]
fn test_breakers_share_metric_set() {
    let (bridge, registry) = bridge_with_registry();
    let first = StubBreaker::new("first");
    let second = StubBreaker::with_group("second", "backends");

    bridge.bind(&first).unwrap();
    bridge.bind(&second).unwrap();
    first.exec(|| Ok(())).unwrap();
    second.exec(|| Ok(())).unwrap();
    second.exec(|| Ok(())).unwrap();

    assert_eq!(registry.len(), 9);
    assert_eq!(bridge.binding_count(), 2);

    let exposition = registry.encode().unwrap();
    assert_eq!(
        sample(&exposition, "breaker_execute_total", &[("breaker_name", "first")]),
        Some(1.0)
    );
    assert_eq!(
        sample(
            &exposition,
            "breaker_execute_total",
            &[("breaker_name", "second"), ("breaker_group", "backends")]
        ),
        Some(2.0)
    );
}

#[test]
fn test_second_bridge_on_same_registry_fails_fast() {
    let (bridge, registry) = bridge_with_registry();
    bridge.bind(&StubBreaker::new("first")).unwrap();

    let other = EventBridge::with_registry(Arc::clone(&registry));
    let second = StubBreaker::new("second");
    let result = other.bind(&second);

    assert!(matches!(result, Err(BridgeError::DuplicateMetric(_))));
    assert_eq!(registry.len(), 9);
}

#[test]
fn test_failed_registration_leaves_registry_untouched() {
    let (bridge, registry) = bridge_with_registry();
    let taken: Counter = Counter::default();
    registry.register(names::TIMEOUT, "Registered elsewhere", taken).unwrap();
    let breaker = StubBreaker::new("some-name");

    let first = bridge.bind(&breaker);
    assert!(matches!(
        first,
        Err(BridgeError::DuplicateMetric(ref name)) if name == names::TIMEOUT
    ));
    assert_eq!(registry.metric_names(), vec![names::TIMEOUT.to_string()]);
    assert!(bridge.metrics().is_none());
    assert_eq!(breaker.handler_count(EventKind::Exec), 0);

    // A retry reports the same clash instead of tripping over its own leftovers
    let second = bridge.bind(&breaker);
    assert!(matches!(
        second,
        Err(BridgeError::DuplicateMetric(ref name)) if name == names::TIMEOUT
    ));
    assert_eq!(registry.len(), 1);

    registry.reset();
    assert!(bridge.bind(&breaker).unwrap().is_some());
    assert_eq!(registry.metric_names(), names::ALL.to_vec());
}

#[test]
fn test_register_all_rejects_clash_within_batch() {
    let registry = MetricsRegistry::new();
    let first: Box<dyn Metric> = Box::new(Counter::<u64>::default());
    let second: Box<dyn Metric> = Box::new(Counter::<u64>::default());
    let entries: Vec<MetricEntry> = vec![
        ("some_counter".to_string(), "First".to_string(), first),
        ("some_counter".to_string(), "Second".to_string(), second),
    ];

    let result = registry.register_all(entries);

    assert!(matches!(
        result,
        Err(BridgeError::DuplicateMetric(ref name)) if name == "some_counter"
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_summary_totals_exposed_through_histogram() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = BreakerHandle::new("totals");
    bridge.bind(&breaker).unwrap();

    breaker.emit(BreakerEvent::Success(Duration::from_millis(100)));
    breaker.emit(BreakerEvent::Failure(Duration::from_millis(300)));
    breaker.emit(BreakerEvent::Timeout(Duration::from_millis(500)));

    let exposition = registry.encode().unwrap();
    assert!(exposition.contains("# TYPE breaker_duration_seconds gauge"));
    assert!(!exposition.contains("breaker_duration_seconds_sum"));

    let labels = [("breaker_name", "totals")];
    let snapshot = bridge
        .metrics()
        .unwrap()
        .duration_snapshot(&BreakerLabels::of(&breaker))
        .unwrap();
    let sum = sample(&exposition, "breaker_duration_buckets_seconds_sum", &labels).unwrap();
    let count = sample(&exposition, "breaker_duration_buckets_seconds_count", &labels).unwrap();
    assert!((sum - snapshot.sum).abs() < 1e-9);
    assert!((sum - 0.9).abs() < 1e-9);
    assert_eq!(count, snapshot.count as f64);
    assert_eq!(count, 3.0);
}

#[test]
fn test_duplicate_binding_merge() {
    let (bridge, registry) = bridge_with_registry();
    let first = StubBreaker::new("shared");
    let second = StubBreaker::new("shared");

    bridge.bind(&first).unwrap();
    bridge.bind(&second).unwrap();
    first.exec(|| Ok(())).unwrap();
    second.exec(|| Ok(())).unwrap();

    let exposition = registry.encode().unwrap();
    assert_eq!(
        sample(&exposition, "breaker_execute_total", &[("breaker_name", "shared")]),
        Some(2.0)
    );

    // Unbinding one leaves the other recording
    assert_eq!(bridge.unbind(&first), EventKind::COUNT);
    assert_eq!(bridge.binding_count(), 1);
    first.exec(|| Ok(())).unwrap();
    second.exec(|| Ok(())).unwrap();

    let exposition = registry.encode().unwrap();
    assert_eq!(
        sample(&exposition, "breaker_execute_total", &[("breaker_name", "shared")]),
        Some(3.0)
    );
}

#[test]
fn test_duplicate_binding_reject() {
    let bridge = EventBridge::builder()
        .duplicate_policy(DuplicatePolicy::Reject)
        .build()
        .unwrap();
    let first = StubBreaker::with_group("shared", "backends");
    let second = StubBreaker::with_group("shared", "backends");
    let other_group = StubBreaker::with_group("shared", "frontends");

    bridge.bind(&first).unwrap();
    let result = bridge.bind(&second);

    assert!(matches!(
        result,
        Err(BridgeError::DuplicateBinding { ref name, ref group })
            if name == "shared" && group.as_deref() == Some("backends")
    ));
    assert_eq!(second.handler_count(EventKind::Exec), 0);
    assert!(bridge.bind(&other_group).unwrap().is_some());
}

#[test]
fn test_unbind_stops_recording() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = StubBreaker::new("detached");

    bridge.bind(&breaker).unwrap();
    breaker.exec(|| Ok(())).unwrap();

    assert_eq!(bridge.unbind(&breaker), EventKind::COUNT);
    assert_eq!(breaker.handler_count(EventKind::Exec), 0);
    assert!(!bridge.is_bound(&BreakerLabels::of(&breaker)));

    breaker.exec(|| Ok(())).unwrap();

    let exposition = registry.encode().unwrap();
    assert_eq!(
        sample(&exposition, "breaker_execute_total", &[("breaker_name", "detached")]),
        Some(1.0)
    );
    assert_eq!(bridge.unbind(&breaker), 0);
}

#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<(String, EventKind)>>>,
}

impl RecordingSink {
    fn push(&self, labels: &BreakerLabels, kind: EventKind) {
        self.events.lock().push((labels.name().to_string(), kind));
    }
}

impl MetricSink for RecordingSink {
    fn record_execution(&self, labels: &BreakerLabels) {
        self.push(labels, EventKind::Exec);
    }

    fn record_success(&self, labels: &BreakerLabels, _duration: Duration) {
        self.push(labels, EventKind::Success);
    }

    fn record_failure(&self, labels: &BreakerLabels, _duration: Duration) {
        self.push(labels, EventKind::Failure);
    }

    fn record_timeout(&self, labels: &BreakerLabels, _duration: Duration) {
        self.push(labels, EventKind::Timeout);
    }

    fn record_rejection(&self, labels: &BreakerLabels) {
        self.push(labels, EventKind::HealthCheckFailed);
    }

    fn record_circuit_closed(&self, labels: &BreakerLabels) {
        self.push(labels, EventKind::CircuitClosed);
    }

    fn record_circuit_opened(&self, labels: &BreakerLabels) {
        self.push(labels, EventKind::CircuitOpen);
    }
}

#[test]
fn test_custom_sink_receives_events() {
    let sink = RecordingSink::default();
    let bridge = EventBridge::builder().sink(sink.clone()).build().unwrap();
    let breaker = BreakerHandle::new("custom");

    bridge.bind(&breaker).unwrap();
    breaker.emit(BreakerEvent::Exec);
    breaker.emit(BreakerEvent::Failure(Duration::from_millis(5)));
    breaker.emit(BreakerEvent::CircuitOpen);

    let events = sink.events.lock().clone();
    assert_eq!(
        events,
        vec![
            ("custom".to_string(), EventKind::Exec),
            ("custom".to_string(), EventKind::Failure),
            ("custom".to_string(), EventKind::CircuitOpen),
        ]
    );
    assert!(bridge.metrics().is_none());
}

#[test]
fn test_summary_window_expires_observations() {
    let registry = Arc::new(MetricsRegistry::new());
    let bridge = EventBridge::builder()
        .registry(Arc::clone(&registry))
        .summary_max_age(Duration::from_millis(100))
        .summary_age_buckets(2)
        .build()
        .unwrap();
    let breaker = BreakerHandle::new("aging");
    bridge.bind(&breaker).unwrap();

    breaker.emit(BreakerEvent::Success(Duration::from_secs(2)));
    thread::sleep(Duration::from_millis(250));
    breaker.emit(BreakerEvent::Success(Duration::from_millis(10)));

    let snapshot = bridge
        .metrics()
        .unwrap()
        .duration_snapshot(&BreakerLabels::of(&breaker))
        .unwrap();
    assert_eq!(snapshot.count, 2);
    assert!((snapshot.sum - 2.01).abs() < 1e-9);
    assert_eq!(snapshot.quantile(1.0), Some(0.01));
    assert_eq!(snapshot.quantile(0.0), Some(0.01));
}

#[test]
fn test_registry_reset() {
    let (bridge, registry) = bridge_with_registry();
    bridge.bind(&StubBreaker::new("some-name")).unwrap();

    registry.reset();

    assert!(registry.is_empty());
    assert!(!registry.contains(names::EXECUTE));
    assert_eq!(sample_count(&registry.encode().unwrap()), 0);
}

#[test]
fn test_concurrent_emission() {
    let (bridge, registry) = bridge_with_registry();
    let breaker = Arc::new(BreakerHandle::new("concurrent"));
    bridge.bind(&breaker).unwrap();

    const THREAD_COUNT: usize = 4;
    const ITERATIONS_PER_THREAD: usize = 250;

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let breaker = Arc::clone(&breaker);
            thread::spawn(move || {
                for _ in 0..ITERATIONS_PER_THREAD {
                    breaker.emit(BreakerEvent::Exec);
                    breaker.emit(BreakerEvent::Success(Duration::from_millis(1)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let exposition = registry.encode().unwrap();
    let expected = (THREAD_COUNT * ITERATIONS_PER_THREAD) as f64;
    let labels = [("breaker_name", "concurrent")];
    assert_eq!(sample(&exposition, "breaker_execute_total", &labels), Some(expected));
    assert_eq!(
        sample(&exposition, "breaker_duration_buckets_seconds_count", &labels),
        Some(expected)
    );
}
