//! # Metrics Collector
//!
//! In-memory counters, gauges, and histograms for service observability.
//! All mutation goes through one mutex with short critical sections;
//! the snapshot computes histogram summaries (count / sum / min / max /
//! mean / p50 / p95 / p99) by linear interpolation over the sorted buffer.
//!
//! Histograms keep the 10,000 most recent observations: enough for stable
//! percentiles, bounded memory for a long-running process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Maximum observations retained per histogram.
const HISTOGRAM_CAP: usize = 10_000;

/// Summary statistics over a histogram's retained observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Number of retained observations.
    pub count: usize,
    /// Sum of retained observations.
    pub sum: f64,
    /// Smallest observation.
    pub min: f64,
    /// Largest observation.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median (linear interpolation).
    pub p50: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
}

/// Point-in-time view of every metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Monotonic counters by key.
    pub counters: BTreeMap<String, u64>,
    /// Histogram summaries by key.
    pub histograms: BTreeMap<String, HistogramSummary>,
    /// Gauge values by key.
    pub gauges: BTreeMap<String, f64>,
    /// Collector start time, RFC 3339.
    pub start_time: String,
    /// Seconds since the collector started.
    pub uptime_seconds: f64,
}

#[derive(Debug, Default)]
struct Inner {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, f64>,
    histograms: BTreeMap<String, Vec<f64>>,
}

/// Thread-safe in-memory metrics collector.
#[derive(Debug)]
pub struct MetricsCollector {
    inner: Mutex<Inner>,
    started_at: DateTime<Utc>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            started_at: Utc::now(),
        }
    }

    /// Increments a counter, creating it at zero first if needed.
    pub fn increment_counter(&self, name: &str, value: u64, labels: &[(&str, &str)]) {
        let key = make_key(name, labels);
        let mut inner = self.lock();
        *inner.counters.entry(key).or_insert(0) += value;
    }

    /// Records a histogram observation, evicting the oldest beyond the cap.
    pub fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let key = make_key(name, labels);
        let mut inner = self.lock();
        let observations = inner.histograms.entry(key).or_default();
        observations.push(value);
        if observations.len() > HISTOGRAM_CAP {
            let excess = observations.len() - HISTOGRAM_CAP;
            observations.drain(..excess);
        }
    }

    /// Sets a gauge to an absolute value.
    pub fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let key = make_key(name, labels);
        self.lock().gauges.insert(key, value);
    }

    /// Adds to a gauge (negative values subtract).
    pub fn add_gauge(&self, name: &str, delta: f64, labels: &[(&str, &str)]) {
        let key = make_key(name, labels);
        let mut inner = self.lock();
        *inner.gauges.entry(key).or_insert(0.0) += delta;
    }

    /// Snapshots every metric with histogram summaries computed.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();

        let histograms = inner
            .histograms
            .iter()
            .filter(|(_, observations)| !observations.is_empty())
            .map(|(key, observations)| (key.clone(), summarize(observations)))
            .collect();

        MetricsSnapshot {
            counters: inner.counters.clone(),
            histograms,
            gauges: inner.gauges.clone(),
            start_time: self.started_at.to_rfc3339(),
            uptime_seconds: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
        }
    }

    /// Clears every metric. Intended for tests.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.counters.clear();
        inner.gauges.clear();
        inner.histograms.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds a stable key from a metric name and its labels.
///
/// Labels are sorted so `{a, b}` and `{b, a}` address the same series.
fn make_key(name: &str, labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return name.to_string();
    }

    let mut sorted: Vec<(&str, &str)> = labels.to_vec();
    sorted.sort_unstable();

    let rendered: Vec<String> = sorted.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}{{{}}}", name, rendered.join(","))
}

fn summarize(observations: &[f64]) -> HistogramSummary {
    let mut sorted = observations.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = sorted.len();
    let sum: f64 = sorted.iter().sum();

    HistogramSummary {
        count,
        sum,
        min: sorted[0],
        max: sorted[count - 1],
        mean: sum / count as f64,
        p50: percentile(&sorted, 0.50),
        p95: percentile(&sorted, 0.95),
        p99: percentile(&sorted, 0.99),
    }
}

/// Percentile by linear interpolation over sorted data.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let rank = (sorted.len() - 1) as f64 * p;
    let lower = rank.floor() as usize;
    let fraction = rank - lower as f64;

    if lower + 1 < sorted.len() {
        sorted[lower] + fraction * (sorted[lower + 1] - sorted[lower])
    } else {
        sorted[lower]
    }
}
