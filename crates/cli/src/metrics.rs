use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Entities
    entities_processed: AtomicUsize,
    entities_failed: AtomicUsize,

    // Elements
    reviews_extracted: AtomicUsize,
    elements_skipped: AtomicUsize,
    elements_failed: AtomicUsize,

    // Timing (in microseconds)
    total_entity_time_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entities_processed: AtomicUsize::new(0),
            entities_failed: AtomicUsize::new(0),
            reviews_extracted: AtomicUsize::new(0),
            elements_skipped: AtomicUsize::new(0),
            elements_failed: AtomicUsize::new(0),
            total_entity_time_us: AtomicU64::new(0),
        })
    }

    pub fn record_entity(&self, duration: Duration, reviews: usize, skipped: usize, failed: usize) {
        self.entities_processed.fetch_add(1, Ordering::Relaxed);
        self.total_entity_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.reviews_extracted.fetch_add(reviews, Ordering::Relaxed);
        self.elements_skipped.fetch_add(skipped, Ordering::Relaxed);
        self.elements_failed.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn record_entity_failure(&self) {
        self.entities_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let processed = self.entities_processed.load(Ordering::Relaxed);
        let total_us = self.total_entity_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            entities_processed: processed,
            entities_failed: self.entities_failed.load(Ordering::Relaxed),
            reviews_extracted: self.reviews_extracted.load(Ordering::Relaxed),
            elements_skipped: self.elements_skipped.load(Ordering::Relaxed),
            elements_failed: self.elements_failed.load(Ordering::Relaxed),
            avg_entity_time_ms: if processed > 0 {
                total_us / processed as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub entities_processed: usize,
    pub entities_failed: usize,
    pub reviews_extracted: usize,
    pub elements_skipped: usize,
    pub elements_failed: usize,
    pub avg_entity_time_ms: f64,
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
    fn test_snapshot_averages() {
        let metrics = Metrics::new();
        metrics.record_entity(Duration::from_millis(40), 10, 2, 1);
        metrics.record_entity(Duration::from_millis(20), 5, 0, 0);
        metrics.record_entity_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.entities_processed, 2);
        assert_eq!(snapshot.entities_failed, 1);
        assert_eq!(snapshot.reviews_extracted, 15);
        assert_eq!(snapshot.elements_skipped, 2);
        assert_eq!(snapshot.elements_failed, 1);
        assert_eq!(snapshot.avg_entity_time_ms, 30.0);
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(Metrics::new().snapshot().avg_entity_time_ms, 0.0);
    }
}
