#![cfg(not(feature = "prometheus"))]

mod common;

use circuitbreaker_metrics::{EventBridge, EventKind, NullMetricSink};
use common::StubBreaker;

#[test]
fn test_default_build_without_backend_is_disabled() {
    let bridge = EventBridge::builder().prefix("some_prefix_").build().unwrap();
    let breaker = StubBreaker::new("some-name");

    assert!(!bridge.is_enabled());
    assert!(bridge.bind(&breaker).unwrap().is_none());
    assert_eq!(bridge.binding_count(), 0);
    assert_eq!(breaker.handler_count(EventKind::Exec), 0);

    breaker.exec(|| Ok(())).unwrap();
    assert_eq!(bridge.unbind(&breaker), 0);
}

#[test]
fn test_explicit_sink_still_binds_without_backend() {
    let bridge = EventBridge::builder().sink(NullMetricSink).build().unwrap();
    let breaker = StubBreaker::new("some-name");

    assert!(bridge.is_enabled());
    assert!(bridge.bind(&breaker).unwrap().is_some());
    assert_eq!(breaker.handler_count(EventKind::Exec), 1);
}
