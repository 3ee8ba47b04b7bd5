//! Quantile tracking for execution durations.
//!
//! prometheus-client ships counters, gauges and histograms but no summary, so
//! the bridge carries its own. Each label tuple keeps a window of recent
//! observations split into age buckets (like a rotating time window) and
//! capped in size; quantiles are computed from the window when the registry
//! is encoded. Sum and count are cumulative and never expire.
//!
//! The summary is exposed as a gauge family with an extra `quantile` label,
//! one sample per configured quantile and label tuple. The text encoder only
//! writes suffixed samples for counters and histograms, so there are no
//! `_sum` or `_count` lines. The duration histogram observes the same values
//! and its `_sum` and `_count` carry those totals; `Summary::snapshot` gives
//! them in-process.

use ahash::AHashMap;
use parking_lot::Mutex;
use prometheus_client::encoding::{EncodeLabelSet, EncodeMetric, MetricEncoder};
use prometheus_client::metrics::MetricType;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;

use crate::config::SummaryOptions;
use crate::metrics::BreakerLabels;

/// Point-in-time view of one summary series.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    /// Total number of observations.
    pub count: u64,

    /// Sum of all observations.
    pub sum: f64,

    /// `(quantile, value)` pairs over the retained window.
    pub quantiles: Vec<(f64, f64)>,
}

impl SummarySnapshot {
    /// Gets the value of a configured quantile.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|(quantile, _)| *quantile == q)
            .map(|(_, value)| *value)
    }
}

#[derive(Debug)]
struct Series {
    window: SmallVec<[(Instant, Vec<f64>); 8]>, // (bucket start, observations)
    retained: usize,
    sum: f64,
    count: u64,
}

impl Series {
    fn new() -> Self {
        Self {
            window: SmallVec::new(),
            retained: 0,
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, value: f64, options: &SummaryOptions, now: Instant) {
        self.sum += value;
        self.count += 1;
        self.expire(options, now);

        let bucket_span = options.max_age.map(|age| age / options.age_buckets);
        let rotate = match (self.window.last(), bucket_span) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(bucket), Some(span)) => now.duration_since(bucket.0) >= span,
        };
        if rotate {
            self.window.push((now, Vec::new()));
        }
        if let Some(bucket) = self.window.last_mut() {
            bucket.1.push(value);
            self.retained += 1;
        }

        while self.retained > options.max_samples {
            let Some(oldest) = self.window.first_mut() else {
                break;
            };
            let excess = (self.retained - options.max_samples).min(oldest.1.len());
            oldest.1.drain(..excess);
            self.retained -= excess;
            if oldest.1.is_empty() {
                self.window.remove(0);
            }
        }
    }

    fn expire(&mut self, options: &SummaryOptions, now: Instant) {
        let Some(cutoff) = options.max_age.and_then(|age| now.checked_sub(age)) else {
            return;
        };

        while let Some(bucket) = self.window.first() {
            if bucket.0 < cutoff {
                self.retained -= bucket.1.len();
                self.window.remove(0);
            } else {
                break;
            }
        }
    }

    fn snapshot(
        &mut self,
        quantiles: &[f64],
        options: &SummaryOptions,
        now: Instant,
    ) -> SummarySnapshot {
        self.expire(options, now);

        let mut sorted: Vec<f64> = self
            .window
            .iter()
            .flat_map(|(_, values)| values.iter().copied())
            .collect();
        sorted.sort_by(f64::total_cmp);

        SummarySnapshot {
            count: self.count,
            sum: self.sum,
            quantiles: quantiles
                .iter()
                .map(|q| (*q, quantile_of_sorted(&sorted, *q)))
                .collect(),
        }
    }
}

// Nearest-rank; NaN when the window is empty.
fn quantile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

/// A summary of observations per breaker label tuple.
///
/// Clones share the same series, so a clone can be handed to a registry while
/// this instance keeps recording.
#[derive(Debug, Clone)]
pub struct Summary {
    quantiles: Arc<[f64]>,
    options: SummaryOptions,
    series: Arc<Mutex<AHashMap<BreakerLabels, Series>>>,
}

impl Summary {
    /// Creates a summary tracking the given quantiles.
    pub fn new(quantiles: &[f64], options: SummaryOptions) -> Self {
        debug_assert!(quantiles.iter().all(|q| (0.0..=1.0).contains(q)));

        Self {
            quantiles: quantiles.into(),
            options,
            series: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Records an observation for a label tuple.
    pub fn observe(&self, labels: &BreakerLabels, value: f64) {
        let now = Instant::now();
        let mut series = self.series.lock();
        match series.get_mut(labels) {
            Some(s) => s.observe(value, &self.options, now),
            None => {
                let mut s = Series::new();
                s.observe(value, &self.options, now);
                series.insert(labels.clone(), s);
            }
        }
    }

    /// Gets the current state of a label tuple's series.
    ///
    /// Returns `None` if nothing was ever observed for it.
    pub fn snapshot(&self, labels: &BreakerLabels) -> Option<SummarySnapshot> {
        let now = Instant::now();
        self.series
            .lock()
            .get_mut(labels)
            .map(|s| s.snapshot(&self.quantiles, &self.options, now))
    }

    /// Gets the tracked quantiles.
    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    /// Gets the number of label tuples with observations.
    pub fn len(&self) -> usize {
        self.series.lock().len()
    }

    /// Returns true if nothing has been observed.
    pub fn is_empty(&self) -> bool {
        self.series.lock().is_empty()
    }

    /// Drops every series.
    pub fn clear(&self) {
        self.series.lock().clear();
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct QuantileLabels {
    breaker_name: String,
    breaker_group: String,
    quantile: String,
}

impl EncodeMetric for Summary {
    fn encode(&self, mut encoder: MetricEncoder) -> Result<(), std::fmt::Error> {
        let now = Instant::now();
        let mut series = self.series.lock();

        let mut snapshots: Vec<(&BreakerLabels, SummarySnapshot)> = series
            .iter_mut()
            .map(|(labels, s)| (labels, s.snapshot(&self.quantiles, &self.options, now)))
            .collect();
        snapshots.sort_by(|a, b| (a.0.name(), a.0.group()).cmp(&(b.0.name(), b.0.group())));

        for (labels, snapshot) in snapshots {
            for (q, value) in snapshot.quantiles {
                let quantile_labels = QuantileLabels {
                    breaker_name: labels.name().to_string(),
                    breaker_group: labels.group().unwrap_or_default().to_string(),
                    quantile: q.to_string(),
                };
                encoder.encode_family(&quantile_labels)?.encode_gauge(&value)?;
            }
        }

        Ok(())
    }

    fn metric_type(&self) -> MetricType {
        MetricType::Gauge
    }
}
