//! Circuit breaker lifecycle events.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::error::BridgeError;

/// The kinds of events a circuit breaker emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An execution was attempted.
    Exec,

    /// An execution completed successfully.
    Success,

    /// An execution failed.
    Failure,

    /// An execution exceeded its deadline.
    Timeout,

    /// An execution was rejected by the breaker's health check.
    HealthCheckFailed,

    /// The circuit closed.
    CircuitClosed,

    /// The circuit opened.
    CircuitOpen,
}

impl EventKind {
    /// Number of distinct event kinds.
    pub const COUNT: usize = 7;

    /// Every event kind, in emission-contract order.
    pub const ALL: [EventKind; EventKind::COUNT] = [
        EventKind::Exec,
        EventKind::Success,
        EventKind::Failure,
        EventKind::Timeout,
        EventKind::HealthCheckFailed,
        EventKind::CircuitClosed,
        EventKind::CircuitOpen,
    ];

    /// The name the breaker's emitter uses for this event.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Exec => "exec",
            EventKind::Success => "success",
            EventKind::Failure => "failure",
            EventKind::Timeout => "timeout",
            EventKind::HealthCheckFailed => "healthCheckFailed",
            EventKind::CircuitClosed => "circuitClosed",
            EventKind::CircuitOpen => "circuitOpen",
        }
    }

    /// Whether events of this kind carry an execution duration.
    pub fn carries_duration(&self) -> bool {
        matches!(
            self,
            EventKind::Success | EventKind::Failure | EventKind::Timeout
        )
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = BridgeError;

    /// Accepts the emitter's camelCase names as well as snake_case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exec" => Ok(EventKind::Exec),
            "success" => Ok(EventKind::Success),
            "failure" => Ok(EventKind::Failure),
            "timeout" => Ok(EventKind::Timeout),
            "healthCheckFailed" | "health_check_failed" => Ok(EventKind::HealthCheckFailed),
            "circuitClosed" | "circuit_closed" => Ok(EventKind::CircuitClosed),
            "circuitOpen" | "circuit_open" => Ok(EventKind::CircuitOpen),
            other => Err(BridgeError::UnknownEvent(other.to_string())),
        }
    }
}

/// A single event observed on a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerEvent {
    /// An execution was attempted.
    Exec,

    /// An execution succeeded after the given duration.
    Success(Duration),

    /// An execution failed after the given duration.
    Failure(Duration),

    /// An execution timed out after the given duration.
    Timeout(Duration),

    /// The health check rejected an execution.
    HealthCheckFailed,

    /// The circuit closed.
    CircuitClosed,

    /// The circuit opened.
    CircuitOpen,
}

impl BreakerEvent {
    /// Gets the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            BreakerEvent::Exec => EventKind::Exec,
            BreakerEvent::Success(_) => EventKind::Success,
            BreakerEvent::Failure(_) => EventKind::Failure,
            BreakerEvent::Timeout(_) => EventKind::Timeout,
            BreakerEvent::HealthCheckFailed => EventKind::HealthCheckFailed,
            BreakerEvent::CircuitClosed => EventKind::CircuitClosed,
            BreakerEvent::CircuitOpen => EventKind::CircuitOpen,
        }
    }

    /// Gets the execution duration carried by this event, if any.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            BreakerEvent::Success(d) | BreakerEvent::Failure(d) | BreakerEvent::Timeout(d) => {
                Some(*d)
            }
            _ => None,
        }
    }

    /// Gets the execution duration in seconds, the unit every duration metric uses.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration().map(|d| d.as_secs_f64())
    }
}
