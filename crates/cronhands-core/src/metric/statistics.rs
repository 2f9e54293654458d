//! Bounded execution history with aggregate statistics.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;
use serde::Serialize;

use super::JobMetric;

/// Default number of executions retained.
pub const MAX_METRICS: usize = cronhands_config::DEFAULT_METRICS_CAPACITY;

/// Duration summary for one job name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationStats {
    pub count: u64,
    pub total_ms: f64,
    pub average_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl DurationStats {
    fn first(duration_ms: f64) -> Self {
        Self {
            count: 1,
            total_ms: duration_ms,
            average_ms: duration_ms,
            min_ms: duration_ms,
            max_ms: duration_ms,
        }
    }

    fn accept(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.average_ms = self.total_ms / self.count as f64;
        self.min_ms = self.min_ms.min(duration_ms);
        self.max_ms = self.max_ms.max(duration_ms);
    }
}

/// Fixed-capacity FIFO history of [`JobMetric`]s.
///
/// Every operation runs under one lock. When full, adding a record evicts
/// the oldest one first, so the size never exceeds the capacity. Reads
/// return copies.
#[derive(Debug)]
pub struct JobMetricStatistics {
    capacity: usize,
    metrics: Mutex<VecDeque<JobMetric>>,
}

impl Default for JobMetricStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl JobMetricStatistics {
    /// History bounded by [`MAX_METRICS`].
    pub fn new() -> Self {
        Self::with_capacity(MAX_METRICS)
    }

    /// History bounded by `capacity` (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            metrics: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record, evicting the oldest one when full.
    pub fn add(&self, metric: JobMetric) {
        let mut metrics = self.metrics.lock();
        while metrics.len() >= self.capacity {
            metrics.pop_front();
        }
        metrics.push_back(metric);
    }

    /// Copy of the history, oldest first.
    pub fn all_metrics(&self) -> Vec<JobMetric> {
        self.metrics.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.lock().is_empty()
    }

    pub fn total_runs(&self) -> usize {
        self.len()
    }

    pub fn success_count(&self) -> usize {
        self.metrics.lock().iter().filter(|m| m.successful).count()
    }

    pub fn failure_count(&self) -> usize {
        self.metrics.lock().iter().filter(|m| !m.successful).count()
    }

    /// Share of successful runs in percent, `0.0` when empty.
    pub fn success_percentage(&self) -> f64 {
        let metrics = self.metrics.lock();
        Self::success_share(&metrics)
    }

    /// Share of failed runs in percent, `0.0` when empty.
    pub fn failure_percentage(&self) -> f64 {
        let metrics = self.metrics.lock();
        if metrics.is_empty() {
            return 0.0;
        }
        100.0 - Self::success_share(&metrics)
    }

    fn success_share(metrics: &VecDeque<JobMetric>) -> f64 {
        if metrics.is_empty() {
            return 0.0;
        }
        let successes = metrics.iter().filter(|m| m.successful).count();
        (successes as f64 * 100.0) / metrics.len() as f64
    }

    /// Duration summary per job name.
    pub fn duration_stats_by_job(&self) -> BTreeMap<String, DurationStats> {
        let metrics = self.metrics.lock();
        let mut stats: BTreeMap<String, DurationStats> = BTreeMap::new();
        for metric in metrics.iter() {
            let duration = metric.duration_ms as f64;
            match stats.get_mut(&metric.name) {
                Some(entry) => entry.accept(duration),
                None => {
                    stats.insert(metric.name.clone(), DurationStats::first(duration));
                }
            }
        }
        stats
    }

    /// The longest execution retained; the earliest one wins ties.
    pub fn slowest_execution(&self) -> Option<JobMetric> {
        let metrics = self.metrics.lock();
        metrics
            .iter()
            .fold(None::<&JobMetric>, |slowest, m| match slowest {
                Some(s) if s.duration_ms >= m.duration_ms => Some(s),
                _ => Some(m),
            })
            .cloned()
    }

    pub fn clear(&self) {
        self.metrics.lock().clear();
    }
}

#[cfg(test)]
#[path = "statistics_tests.rs"]
mod tests;
