//! The event bridge between breakers and metrics.

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(feature = "prometheus")]
use once_cell::sync::OnceCell;

use crate::breaker::ObservableBreaker;
use crate::config::{BridgeBuilder, BridgeOptions, DuplicatePolicy};
use crate::error::{BridgeError, BridgeResult};
use crate::event::{BreakerEvent, EventKind};
use crate::hook::SubscriptionId;
use crate::metrics::{BreakerLabels, MetricSink};
#[cfg(feature = "prometheus")]
use crate::prometheus::BreakerMetrics;
#[cfg(feature = "prometheus")]
use crate::registry::MetricsRegistry;

/// Where a bridge sends observed events.
pub(crate) enum Backend {
    /// No metrics backend; binds are logged no-ops.
    Disabled,

    /// A caller supplied sink.
    Sink(Arc<dyn MetricSink>),

    /// Prometheus metrics, created on the first bind.
    #[cfg(feature = "prometheus")]
    Prometheus {
        registry: Arc<MetricsRegistry>,
        metrics: OnceCell<Arc<BreakerMetrics>>,
    },
}

impl Backend {
    #[cfg(feature = "prometheus")]
    pub(crate) fn prometheus(registry: Arc<MetricsRegistry>) -> Self {
        Backend::Prometheus {
            registry,
            metrics: OnceCell::new(),
        }
    }
}

struct Binding {
    labels: BreakerLabels,
    subscriptions: SmallVec<[SubscriptionId; EventKind::COUNT]>,
}

/// Republishes breaker events as metrics.
///
/// A bridge owns one metric set (created lazily on the first bind) and any
/// number of bindings. Each binding installs one handler per event kind on a
/// breaker and labels everything it records with the breaker's name and group.
pub struct EventBridge {
    backend: Backend,
    options: BridgeOptions,
    bindings: Mutex<Vec<Binding>>,
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.backend {
            Backend::Disabled => "disabled",
            Backend::Sink(_) => "sink",
            #[cfg(feature = "prometheus")]
            Backend::Prometheus { .. } => "prometheus",
        };
        f.debug_struct("EventBridge")
            .field("backend", &backend)
            .field("options", &self.options)
            .field("bindings", &self.bindings.lock().len())
            .finish()
    }
}

impl EventBridge {
    pub(crate) fn new(backend: Backend, options: BridgeOptions) -> Self {
        Self {
            backend,
            options,
            bindings: Mutex::new(Vec::new()),
        }
    }

    /// Creates a new builder for customizing a bridge.
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Creates a bridge recording into a shared registry with default options.
    #[cfg(feature = "prometheus")]
    pub fn with_registry(registry: Arc<MetricsRegistry>) -> Self {
        Self::new(Backend::prometheus(registry), BridgeOptions::default())
    }

    /// Creates a bridge that records nothing.
    pub fn disabled() -> Self {
        Self::new(Backend::Disabled, BridgeOptions::default())
    }

    /// Gets the bridge options.
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Returns true if binds record metrics.
    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, Backend::Disabled)
    }

    /// Gets the registry the bridge records into, if it is Prometheus-backed.
    #[cfg(feature = "prometheus")]
    pub fn registry(&self) -> Option<&Arc<MetricsRegistry>> {
        match &self.backend {
            Backend::Prometheus { registry, .. } => Some(registry),
            _ => None,
        }
    }

    /// Gets the metric set, if a Prometheus-backed bridge has bound a breaker.
    #[cfg(feature = "prometheus")]
    pub fn metrics(&self) -> Option<&Arc<BreakerMetrics>> {
        match &self.backend {
            Backend::Prometheus { metrics, .. } => metrics.get(),
            _ => None,
        }
    }

    fn sink(&self) -> BridgeResult<Option<Arc<dyn MetricSink>>> {
        match &self.backend {
            Backend::Disabled => Ok(None),
            Backend::Sink(sink) => Ok(Some(Arc::clone(sink))),
            #[cfg(feature = "prometheus")]
            Backend::Prometheus { registry, metrics } => {
                let metrics = metrics.get_or_try_init(|| {
                    BreakerMetrics::register(registry, &self.options).map(Arc::new)
                })?;
                Ok(Some(Arc::clone(metrics) as Arc<dyn MetricSink>))
            }
        }
    }

    /// Starts recording a breaker's events.
    ///
    /// Returns the breaker back for chaining, or `None` when the bridge has
    /// no metrics backend. Errors from preparing the backend, and duplicate
    /// bindings under [`DuplicatePolicy::Reject`], are returned unchanged.
    pub fn bind<'b, B>(&self, breaker: &'b B) -> BridgeResult<Option<&'b B>>
    where
        B: ObservableBreaker + ?Sized,
    {
        let Some(sink) = self.sink()? else {
            info!(
                breaker = breaker.name(),
                "metrics backend not available, breaker metrics will not be recorded"
            );
            return Ok(None);
        };

        let labels = BreakerLabels::of(breaker);
        let mut bindings = self.bindings.lock();

        if self.options.duplicate_policy == DuplicatePolicy::Reject
            && bindings.iter().any(|b| b.labels == labels)
        {
            warn!(
                breaker = labels.name(),
                group = labels.group(),
                "rejecting duplicate breaker binding"
            );
            return Err(BridgeError::DuplicateBinding {
                name: labels.name().to_string(),
                group: labels.group().map(str::to_string),
            });
        }

        let subscriptions = EventKind::ALL
            .iter()
            .map(|kind| {
                let sink = Arc::clone(&sink);
                let labels = labels.clone();
                breaker.subscribe(
                    *kind,
                    Arc::new(move |event: &BreakerEvent| sink.record(&labels, event)),
                )
            })
            .collect();

        debug!(
            breaker = labels.name(),
            group = labels.group(),
            handlers = EventKind::COUNT,
            "bound breaker"
        );
        bindings.push(Binding {
            labels,
            subscriptions,
        });

        Ok(Some(breaker))
    }

    /// Stops recording a breaker's events.
    ///
    /// Returns the number of handlers removed from the breaker; zero if the
    /// breaker was never bound by this bridge.
    pub fn unbind<B>(&self, breaker: &B) -> usize
    where
        B: ObservableBreaker + ?Sized,
    {
        let labels = BreakerLabels::of(breaker);
        let mut bindings = self.bindings.lock();
        let mut removed = 0;

        bindings.retain_mut(|binding| {
            if binding.labels != labels {
                return true;
            }

            // Under DuplicatePolicy::Merge several breakers may share the
            // labels; only the ones this breaker recognizes are its own.
            let before = binding.subscriptions.len();
            binding
                .subscriptions
                .retain(|id| !breaker.unsubscribe(*id));
            removed += before - binding.subscriptions.len();
            !binding.subscriptions.is_empty()
        });

        debug!(
            breaker = labels.name(),
            group = labels.group(),
            handlers = removed,
            "unbound breaker"
        );
        removed
    }

    /// Gets the number of active bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.lock().len()
    }

    /// Returns true if a breaker with these labels is bound.
    pub fn is_bound(&self, labels: &BreakerLabels) -> bool {
        self.bindings.lock().iter().any(|b| b.labels == *labels)
    }
}
