use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::cache::Operation;

#[derive(Default)]
struct OperationTimer {
    total_time_us: AtomicU64,
    count: AtomicUsize,
}

impl OperationTimer {
    fn record(&self, duration: Duration) {
        self.total_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn avg_time_ms(&self) -> f64 {
        let total = self.total_time_us.load(Ordering::Relaxed) as f64;
        let cnt = self.count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Default)]
pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    cache_write_failures: AtomicUsize,
    degraded_responses: AtomicUsize,

    // Timing of computed (uncached) responses
    search: OperationTimer,
    diagnosis: OperationTimer,
    interactions: OperationTimer,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_write_failure(&self) {
        self.cache_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded(&self) {
        self.degraded_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_operation(&self, operation: Operation, duration: Duration) {
        match operation {
            Operation::Search => self.search.record(duration),
            Operation::Diagnosis => self.diagnosis.record(duration),
            Operation::Interactions => self.interactions.record(duration),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            degraded_responses: self.degraded_responses.load(Ordering::Relaxed),
            avg_search_time_ms: self.search.avg_time_ms(),
            avg_diagnosis_time_ms: self.diagnosis.avg_time_ms(),
            avg_interactions_time_ms: self.interactions.avg_time_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_write_failures: usize,
    pub degraded_responses: usize,
    pub avg_search_time_ms: f64,
    pub avg_diagnosis_time_ms: f64,
    pub avg_interactions_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_averages() {
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_cache(true);
        metrics.record_cache(false);
        metrics.record_cache(false);
        metrics.record_operation(Operation::Diagnosis, Duration::from_millis(4));
        metrics.record_operation(Operation::Diagnosis, Duration::from_millis(6));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 2);
        assert!((snapshot.avg_diagnosis_time_ms - 5.0).abs() < 1e-9);
        assert_eq!(snapshot.avg_search_time_ms, 0.0);
    }
}
