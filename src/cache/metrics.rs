//! Lock-free resolution counters.
//!
//! Advisory only: nothing in the resolution path reads these, and they
//! reset with the process. Injected into the coordinator rather than
//! living in a process-wide static so tests can observe them in
//! isolation.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-tier hit/miss counters, shared across all requests.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    short_hits: AtomicU64,
    short_misses: AtomicU64,
    long_hits: AtomicU64,
    long_misses: AtomicU64,
    fresh_fetches: AtomicU64,
    fetch_failures: AtomicU64,
    static_hits: AtomicU64,
    static_misses: AtomicU64,
    exhaustions: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_short_hit(&self) {
        self.short_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_short_miss(&self) {
        self.short_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_long_hit(&self) {
        self.long_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_long_miss(&self) {
        self.long_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fresh_fetch(&self) {
        self.fresh_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_static_hit(&self) {
        self.static_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_static_miss(&self) {
        self.static_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhaustion(&self) {
        self.exhaustions.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot for the stats endpoint.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            short_hits: self.short_hits.load(Ordering::Relaxed),
            short_misses: self.short_misses.load(Ordering::Relaxed),
            long_hits: self.long_hits.load(Ordering::Relaxed),
            long_misses: self.long_misses.load(Ordering::Relaxed),
            fresh_fetches: self.fresh_fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            static_hits: self.static_hits.load(Ordering::Relaxed),
            static_misses: self.static_misses.load(Ordering::Relaxed),
            exhaustions: self.exhaustions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub short_hits: u64,
    pub short_misses: u64,
    pub long_hits: u64,
    pub long_misses: u64,
    pub fresh_fetches: u64,
    pub fetch_failures: u64,
    pub static_hits: u64,
    pub static_misses: u64,
    pub exhaustions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = CacheMetrics::new();
        metrics.record_short_hit();
        metrics.record_short_hit();
        metrics.record_fetch_failure();
        let snap = metrics.snapshot();
        assert_eq!(snap.short_hits, 2);
        assert_eq!(snap.fetch_failures, 1);
        assert_eq!(snap.exhaustions, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = CacheMetrics::new();
        metrics.record_static_hit();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["static_hits"], 1);
        assert_eq!(json["short_misses"], 0);
    }
}
