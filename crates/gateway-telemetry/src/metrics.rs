//! Self-reported request/cache/ensemble counters behind `/metrics`.
//!
//! A Prometheus *exporter* is the excluded telemetry-exporter non-goal;
//! these are plain atomic counters the gateway renders as text itself,
//! the way the teacher's own `/metrics` handler reported figures without
//! requiring an external scrape agent to be configured.

use std::sync::atomic::{AtomicU64, Ordering};

/// Placeholder for future tunables (batching, label cardinality limits);
/// kept so the teacher's `Metrics::new(&MetricsConfig::default())`
/// call-site shape survives even though there is nothing to configure yet.
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig;

/// Process-wide counters. Cheap to clone (an `Arc` internally would be
/// natural once shared across handlers); kept a plain struct of atomics
/// since every field is independently lock-free.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_failed_total: AtomicU64,
    cache_hits_total: AtomicU64,
    cache_misses_total: AtomicU64,
    ensemble_calls_total: AtomicU64,
    ensemble_latency_ms_total: AtomicU64,
}

impl Metrics {
    /// Build a fresh counter set.
    #[must_use]
    pub fn new(_config: &MetricsConfig) -> Self {
        Self::default()
    }

    /// Record one inbound request.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one request that ended in an error response.
    pub fn record_failure(&self) {
        self.requests_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a semantic cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a semantic cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed ensemble run and its wall-clock latency.
    pub fn record_ensemble_latency(&self, latency_ms: u64) {
        self.ensemble_calls_total.fetch_add(1, Ordering::Relaxed);
        self.ensemble_latency_ms_total
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// A point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let calls = self.ensemble_calls_total.load(Ordering::Relaxed);
        let latency_total = self.ensemble_latency_ms_total.load(Ordering::Relaxed);
        let hits = self.cache_hits_total.load(Ordering::Relaxed);
        let misses = self.cache_misses_total.load(Ordering::Relaxed);
        let lookups = hits + misses;

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_failed_total: self.requests_failed_total.load(Ordering::Relaxed),
            cache_hits_total: hits,
            cache_misses_total: misses,
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            ensemble_calls_total: calls,
            ensemble_avg_latency_ms: if calls == 0 {
                0.0
            } else {
                latency_total as f64 / calls as f64
            },
        }
    }

    /// Render the current counters as the plain-text body of `/metrics`.
    #[must_use]
    pub fn render_text(&self) -> String {
        let s = self.snapshot();
        format!(
            "gateway_requests_total {}\n\
             gateway_requests_failed_total {}\n\
             gateway_cache_hits_total {}\n\
             gateway_cache_misses_total {}\n\
             gateway_cache_hit_rate {}\n\
             gateway_ensemble_calls_total {}\n\
             gateway_ensemble_avg_latency_ms {}\n",
            s.requests_total,
            s.requests_failed_total,
            s.cache_hits_total,
            s.cache_misses_total,
            s.cache_hit_rate,
            s.ensemble_calls_total,
            s.ensemble_avg_latency_ms,
        )
    }
}

/// An immutable copy of the counters at one instant, with derived
/// averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Total requests accepted.
    pub requests_total: u64,
    /// Requests that produced an error response.
    pub requests_failed_total: u64,
    /// Semantic cache hits.
    pub cache_hits_total: u64,
    /// Semantic cache misses.
    pub cache_misses_total: u64,
    /// `hits / (hits + misses)`, 0 when there have been no lookups.
    pub cache_hit_rate: f64,
    /// Completed ensemble runs.
    pub ensemble_calls_total: u64,
    /// Average ensemble wall-clock latency in milliseconds.
    pub ensemble_avg_latency_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_cache_hit_rate() {
        let metrics = Metrics::new(&MetricsConfig::default());
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits_total, 2);
        assert_eq!(snapshot.cache_misses_total, 1);
        assert!((snapshot.cache_hit_rate - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn snapshot_is_zero_before_any_lookup() {
        let metrics = Metrics::new(&MetricsConfig::default());
        assert!((metrics.snapshot().cache_hit_rate - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ensemble_latency_averages_across_calls() {
        let metrics = Metrics::new(&MetricsConfig::default());
        metrics.record_ensemble_latency(100);
        metrics.record_ensemble_latency(300);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ensemble_calls_total, 2);
        assert!((snapshot.ensemble_avg_latency_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn render_text_includes_every_counter_line() {
        let metrics = Metrics::new(&MetricsConfig::default());
        metrics.record_request();
        let text = metrics.render_text();
        assert!(text.contains("gateway_requests_total 1"));
        assert!(text.contains("gateway_ensemble_avg_latency_ms"));
    }
}
