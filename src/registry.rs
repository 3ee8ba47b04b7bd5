//! Shared Prometheus registry.

use ahash::AHashSet;
use parking_lot::Mutex;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeMetric, MetricEncoder};
use prometheus_client::metrics::MetricType;
use prometheus_client::registry::{Metric, Registry};
use std::fmt;

use crate::error::{BridgeError, BridgeResult};

/// A metric waiting to be registered: `(name, help, metric)`.
pub type MetricEntry = (String, String, Box<dyn Metric>);

#[derive(Debug)]
struct Erased(Box<dyn Metric>);

impl EncodeMetric for Erased {
    fn encode(&self, encoder: MetricEncoder) -> Result<(), fmt::Error> {
        (*self.0).encode(encoder)
    }

    fn metric_type(&self) -> MetricType {
        (*self.0).metric_type()
    }
}

struct Inner {
    registry: Registry,
    names: Vec<String>,
    index: AHashSet<String>,
}

/// A prometheus-client registry that rejects duplicate metric names.
///
/// The registry is meant to be created once by the host, shared through an
/// `Arc`, and handed to every bridge that should record into it.
pub struct MetricsRegistry {
    inner: Mutex<Inner>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("names", &self.inner.lock().names)
            .finish()
    }
}

impl MetricsRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                registry: Registry::default(),
                names: Vec::new(),
                index: AHashSet::new(),
            }),
        }
    }

    /// Registers a metric under a name that must not already be taken.
    pub fn register<M: Metric>(&self, name: &str, help: &str, metric: M) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        if !inner.index.insert(name.to_string()) {
            return Err(BridgeError::DuplicateMetric(name.to_string()));
        }

        inner.registry.register(name, help, metric);
        inner.names.push(name.to_string());
        Ok(())
    }

    /// Registers a batch of metrics, all or nothing.
    ///
    /// Every name is checked against the registry and the rest of the batch
    /// before anything is registered. On a clash the registry is left as it
    /// was and the first clashing name is returned.
    pub fn register_all(&self, entries: Vec<MetricEntry>) -> BridgeResult<()> {
        let mut inner = self.inner.lock();

        let mut batch = AHashSet::with_capacity(entries.len());
        for (name, _, _) in &entries {
            if inner.index.contains(name.as_str()) || !batch.insert(name.as_str()) {
                return Err(BridgeError::DuplicateMetric(name.clone()));
            }
        }

        for (name, help, metric) in entries {
            inner.registry.register(name.as_str(), help, Erased(metric));
            inner.index.insert(name.clone());
            inner.names.push(name);
        }
        Ok(())
    }

    /// Returns true if a metric with the name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().index.contains(name)
    }

    /// Gets the registered metric names, in registration order.
    pub fn metric_names(&self) -> Vec<String> {
        self.inner.lock().names.clone()
    }

    /// Gets the number of registered metrics.
    pub fn len(&self) -> usize {
        self.inner.lock().names.len()
    }

    /// Returns true if no metric is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().names.is_empty()
    }

    /// Renders every registered metric in the OpenMetrics text format.
    pub fn encode(&self) -> BridgeResult<String> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.inner.lock().registry)?;
        Ok(buffer)
    }

    /// Gives direct access to the wrapped registry.
    ///
    /// Metrics registered this way bypass the duplicate name check.
    pub fn with_registry<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.inner.lock().registry)
    }

    /// Drops every registered metric.
    ///
    /// Bridges that already recorded into this registry keep their metric
    /// handles but are no longer exposed.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.registry = Registry::default();
        inner.names.clear();
        inner.index.clear();
    }
}
