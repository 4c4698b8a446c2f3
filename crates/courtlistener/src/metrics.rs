use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for one validation run.
#[derive(Default)]
pub struct ValidationMetrics {
    lookups: AtomicUsize,
    cache_hits: AtomicUsize,
    found: AtomicUsize,
    not_found: AtomicUsize,
    failures: AtomicUsize,
}

impl ValidationMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_result(&self, found: bool) {
        if found {
            self.found.fetch_add(1, Ordering::Relaxed);
        } else {
            self.not_found.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let lookups = self.lookups.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);

        MetricsSnapshot {
            lookups,
            cache_hits,
            found: self.found.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            cache_hit_rate: hit_rate(cache_hits, lookups),
        }
    }
}

fn hit_rate(hits: usize, lookups: usize) -> f64 {
    let total = hits + lookups;
    if total > 0 {
        hits as f64 / total as f64
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Calls made to the lookup service
    pub lookups: usize,
    pub cache_hits: usize,
    pub found: usize,
    pub not_found: usize,
    /// Lookups that ended in an error after retries
    pub failures: usize,
    pub cache_hit_rate: f64,
}
