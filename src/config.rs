//! Configuration for the metrics bridge.

use std::sync::Arc;
use std::time::Duration;

use crate::bridge::{Backend, EventBridge};
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::MetricSink;
#[cfg(feature = "prometheus")]
use crate::registry::MetricsRegistry;

/// What a bridge does when a breaker with an already bound label tuple is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Both breakers record into the same series.
    #[default]
    Merge,

    /// The second bind fails with [`BridgeError::DuplicateBinding`].
    Reject,
}

/// Sample window settings for the duration summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOptions {
    /// How long an observation contributes to the quantiles. `None` keeps
    /// observations until the sample cap evicts them.
    pub max_age: Option<Duration>,

    /// Number of buckets the age window rotates through.
    pub age_buckets: u32,

    /// Upper bound on retained observations per label tuple.
    pub max_samples: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            age_buckets: 5,
            max_samples: 4096,
        }
    }
}

/// Settings shared by every binding of a bridge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BridgeOptions {
    /// Prepended verbatim to every registered metric name.
    pub prefix: String,

    /// Handling of breakers that share a label tuple.
    pub duplicate_policy: DuplicatePolicy,

    /// Duration summary window.
    pub summary: SummaryOptions,
}

impl BridgeOptions {
    /// Gets the registered name for a base metric name.
    pub fn metric_name(&self, base: &str) -> String {
        format!("{}{}", self.prefix, base)
    }

    /// Checks that the options describe a usable bridge.
    pub fn validate(&self) -> BridgeResult<()> {
        if !is_valid_prefix(&self.prefix) {
            return Err(BridgeError::InvalidConfig(format!(
                "prefix {:?} is not a valid metric name prefix",
                self.prefix
            )));
        }

        if self.summary.age_buckets == 0 {
            return Err(BridgeError::InvalidConfig(
                "summary age_buckets must be at least 1".to_string(),
            ));
        }

        if self.summary.max_samples == 0 {
            return Err(BridgeError::InvalidConfig(
                "summary max_samples must be at least 1".to_string(),
            ));
        }

        if self.summary.max_age == Some(Duration::ZERO) {
            return Err(BridgeError::InvalidConfig(
                "summary max_age must be longer than zero".to_string(),
            ));
        }

        Ok(())
    }
}

// [a-zA-Z_:][a-zA-Z0-9_:]*, or empty
fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        None => true,
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        Some(_) => false,
    }
}

/// Builder for creating bridges with custom configurations.
pub struct BridgeBuilder {
    options: BridgeOptions,
    backend: Option<Backend>,
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeBuilder {
    /// Creates a new builder with default settings.
    ///
    /// Unless a backend is chosen, the bridge records into a private
    /// [`MetricsRegistry`] when the `prometheus` feature is enabled and is
    /// disabled otherwise.
    pub fn new() -> Self {
        Self {
            options: BridgeOptions::default(),
            backend: None,
        }
    }

    /// Sets the prefix prepended to every metric name.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.prefix = prefix.into();
        self
    }

    /// Sets how breakers sharing a label tuple are handled.
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.options.duplicate_policy = policy;
        self
    }

    /// Limits how long an observation contributes to the summary quantiles.
    pub fn summary_max_age(mut self, max_age: Duration) -> Self {
        self.options.summary.max_age = Some(max_age);
        self
    }

    /// Sets the number of buckets the summary age window rotates through.
    pub fn summary_age_buckets(mut self, buckets: u32) -> Self {
        self.options.summary.age_buckets = buckets;
        self
    }

    /// Sets the per-breaker cap on retained summary observations.
    pub fn summary_max_samples(mut self, max_samples: usize) -> Self {
        self.options.summary.max_samples = max_samples;
        self
    }

    /// Records into the given shared registry.
    #[cfg(feature = "prometheus")]
    pub fn registry(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.backend = Some(Backend::prometheus(registry));
        self
    }

    /// Records into a custom metric sink.
    pub fn sink<M: MetricSink>(mut self, sink: M) -> Self {
        self.backend = Some(Backend::Sink(Arc::new(sink)));
        self
    }

    /// Builds a bridge with no metrics backend; every bind is a logged no-op.
    pub fn disabled(mut self) -> Self {
        self.backend = Some(Backend::Disabled);
        self
    }

    /// Gets the options configured so far.
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Builds a new bridge with the configured settings.
    pub fn build(self) -> BridgeResult<EventBridge> {
        self.options.validate()?;

        let backend = match self.backend {
            Some(backend) => backend,
            #[cfg(feature = "prometheus")]
            None => Backend::prometheus(Arc::new(MetricsRegistry::new())),
            #[cfg(not(feature = "prometheus"))]
            None => Backend::Disabled,
        };

        Ok(EventBridge::new(backend, self.options))
    }
}
