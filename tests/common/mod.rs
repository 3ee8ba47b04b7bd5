#![allow(dead_code)]

use circuitbreaker_metrics::{
    BreakerEvent, BreakerHandle, EventHandler, EventKind, ObservableBreaker, SubscriptionId,
};
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

// Custom error type that implements Error trait
#[derive(Debug)]
pub struct TestError(String);

impl TestError {
    pub fn new(msg: &str) -> Self {
        TestError(msg.to_string())
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test error: {}", self.0)
    }
}

impl Error for TestError {}

/// A breaker stand-in that emits the events a real breaker would for each
/// call, without any state machine behind it.
pub struct StubBreaker {
    handle: BreakerHandle,
    timeout: Option<Duration>,
}

impl StubBreaker {
    pub fn new(name: &str) -> Self {
        Self {
            handle: BreakerHandle::new(name),
            timeout: None,
        }
    }

    pub fn with_group(name: &str, group: &str) -> Self {
        Self {
            handle: BreakerHandle::new(name).with_group(group),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn exec<T>(&self, f: impl FnOnce() -> Result<T, TestError>) -> Result<T, TestError> {
        self.handle.emit(BreakerEvent::Exec);

        let start = Instant::now();
        let result = f();
        let duration = start.elapsed();

        if let Some(timeout) = self.timeout {
            if duration >= timeout {
                self.handle.emit(BreakerEvent::Timeout(duration));
                return Err(TestError::new("timed out"));
            }
        }

        match &result {
            Ok(_) => self.handle.emit(BreakerEvent::Success(duration)),
            Err(_) => self.handle.emit(BreakerEvent::Failure(duration)),
        }
        result
    }

    pub fn reject(&self) {
        self.handle.emit(BreakerEvent::HealthCheckFailed);
    }

    pub fn open(&self) {
        self.handle.emit(BreakerEvent::CircuitOpen);
    }

    pub fn close(&self) {
        self.handle.emit(BreakerEvent::CircuitClosed);
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handle.hooks().handler_count(kind)
    }
}

impl ObservableBreaker for StubBreaker {
    fn name(&self) -> &str {
        self.handle.name()
    }

    fn group(&self) -> Option<&str> {
        self.handle.group()
    }

    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.handle.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handle.unsubscribe(id)
    }
}

/// Finds the value of the sample `metric{...}` whose labels contain every
/// given `key="value"` pair.
pub fn sample(exposition: &str, metric: &str, labels: &[(&str, &str)]) -> Option<f64> {
    let prefix = format!("{}{{", metric);
    exposition
        .lines()
        .filter(|line| line.starts_with(&prefix))
        .find(|line| {
            labels
                .iter()
                .all(|(key, value)| line.contains(&format!("{}=\"{}\"", key, value)))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

/// Counts the sample lines (anything that is not a comment) in an exposition.
pub fn sample_count(exposition: &str) -> usize {
    exposition
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .count()
}
