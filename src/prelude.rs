//! Re-exports common types for convenient usage.
//!
//! # Example
//! ```rust,no_run
//! use circuitbreaker_metrics::prelude::*;
//!
//! let bridge = EventBridge::builder().prefix("resolver_").build()?;
//! let breaker = BreakerHandle::new("dns").with_group("resolvers");
//! bridge.bind(&breaker)?;
//! breaker.emit(BreakerEvent::Exec);
//! # Ok::<(), BridgeError>(())
//! ```

pub use crate::breaker::{BreakerHandle, ObservableBreaker};
pub use crate::bridge::EventBridge;
pub use crate::config::{BridgeBuilder, DuplicatePolicy};
pub use crate::error::{BridgeError, BridgeResult};
pub use crate::event::{BreakerEvent, EventKind};
pub use crate::metrics::{BreakerLabels, MetricSink};
#[cfg(feature = "prometheus")]
pub use crate::registry::MetricsRegistry;
