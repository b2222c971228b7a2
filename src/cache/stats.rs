//! Cache Statistics
//!
//! Counters describing how the cache has been used since startup or the
//! last clear, plus the derived hit rate.

use serde::Serialize;

// == Cache Stats ==
/// Usage counters for one cache instance.
///
/// The store owns the canonical copy and bumps counters as operations run.
/// `total_entries`, `max_entries` and `memory_usage_bytes` are gauges filled
/// in from the store when a snapshot is taken, not counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing, or only an expired entry
    pub misses: u64,
    /// Entries written, including overwrites
    pub sets: u64,
    /// Entries removed by an explicit delete or invalidation
    pub deletes: u64,
    /// Entries reclaimed by capacity pressure or expiry
    pub evictions: u64,
    /// Entries currently held by the backend
    pub total_entries: usize,
    /// Entry capacity the store enforces
    pub max_entries: usize,
    /// Sum of the held entries' size estimates, in bytes
    pub memory_usage_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Fraction of reads that were hits, 0.0 when nothing has been read yet.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }

    // == Recording ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Reset ==
    /// Zeroes every counter and gauge.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
