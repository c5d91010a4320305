// Performance Metrics
//
// Counters for rule evaluations and the rule cache. Shared between the
// engine, the PostgreSQL store and the metrics endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

/// Evaluations slower than this are counted and logged
pub const SLOW_EVALUATION_THRESHOLD_MS: u64 = 100;

#[derive(Debug, Default)]
struct MetricsInner {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    evaluations: AtomicU64,
    rules_applied: AtomicU64,
    total_evaluation_time_us: AtomicU64,
    slow_evaluations: AtomicU64,
}

/// Cheaply cloneable handle to shared counters
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    inner: Arc<MetricsInner>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Hit ratio in `[0, 1]`; 0 before any lookup
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.inner.cache_hits.load(Ordering::Relaxed);
        let misses = self.inner.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Starts timing one evaluation; recorded when the timer is dropped
    pub fn start_evaluation(&self) -> OperationTimer {
        OperationTimer {
            start: Instant::now(),
            metrics: self.clone(),
        }
    }

    pub fn record_rules_applied(&self, count: usize) {
        self.inner
            .rules_applied
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_evaluation(&self, duration: Duration) {
        self.inner.evaluations.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_evaluation_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if duration.as_millis() as u64 > SLOW_EVALUATION_THRESHOLD_MS {
            self.inner.slow_evaluations.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Slow discount evaluation: {}ms", duration.as_millis());
        }
    }

    pub fn avg_evaluation_time_ms(&self) -> f64 {
        let count = self.inner.evaluations.load(Ordering::Relaxed);
        let total_us = self.inner.total_evaluation_time_us.load(Ordering::Relaxed);

        if count == 0 {
            0.0
        } else {
            (total_us as f64 / count as f64) / 1000.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cache_hit_rate: self.cache_hit_rate(),
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.inner.cache_misses.load(Ordering::Relaxed),
            evaluations: self.inner.evaluations.load(Ordering::Relaxed),
            rules_applied: self.inner.rules_applied.load(Ordering::Relaxed),
            avg_evaluation_time_ms: self.avg_evaluation_time_ms(),
            slow_evaluations: self.inner.slow_evaluations.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        tracing::info!(
            "Discount metrics: {} evaluations (avg {:.2}ms, {} slow), {} rules applied, \
             cache {:.1}% hit rate ({} hits, {} misses)",
            summary.evaluations,
            summary.avg_evaluation_time_ms,
            summary.slow_evaluations,
            summary.rules_applied,
            summary.cache_hit_rate * 100.0,
            summary.cache_hits,
            summary.cache_misses,
        );
    }
}

/// Records the elapsed time of one evaluation on drop
pub struct OperationTimer {
    start: Instant,
    metrics: PerformanceMetrics,
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        self.metrics.record_evaluation(self.start.elapsed());
    }
}

/// Point-in-time snapshot of the counters
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricsSummary {
    pub cache_hit_rate: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evaluations: u64,
    pub rules_applied: u64,
    pub avg_evaluation_time_ms: f64,
    pub slow_evaluations: u64,
}
