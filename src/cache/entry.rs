//! Cache Entry
//!
//! The unit of storage: a value wrapped with its expiry and access
//! metadata.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// One cached value together with its lifecycle metadata.
///
/// Every entry expires; `expires_at` is derived from the effective TTL at
/// insert time. Access metadata feeds LRU ordering and the debug report, and
/// round-trips through the durable backend so recency survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// Cached payload
    pub value: V,
    /// When the entry was written, Unix milliseconds
    pub created_at: u64,
    /// When the entry stops being served, Unix milliseconds
    pub expires_at: u64,
    /// When the entry was last read, Unix milliseconds
    pub last_accessed_at: u64,
    /// How many reads have hit this entry
    pub access_count: u64,
    /// Approximate value size in bytes, as measured at insert
    pub size_estimate: usize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    ///
    /// # Arguments
    /// * `value` - Payload to cache
    /// * `ttl` - How long the entry stays servable
    /// * `size_estimate` - Approximate payload size in bytes
    pub fn new(value: V, ttl: Duration, size_estimate: usize) -> Self {
        let now = current_timestamp_ms();
        // A TTL past u64 milliseconds clamps to the far future instead of
        // wrapping into the past
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        Self {
            value,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
            last_accessed_at: now,
            access_count: 0,
            size_estimate,
        }
    }

    // == Is Expired ==
    /// Whether the entry's TTL has elapsed.
    ///
    /// The boundary is inclusive: an entry whose `expires_at` equals the
    /// current time already reads as expired, so a zero TTL never serves.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    // == Touch ==
    /// Records a read: bumps the access count and the last access timestamp.
    pub fn touch(&mut self) {
        self.last_accessed_at = current_timestamp_ms();
        self.access_count += 1;
    }

    // == Time To Live ==
    /// Milliseconds until expiry, clamped to 0 for entries already expired.
    ///
    /// Feeds the per-entry diagnostics in the debug report.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let now = current_timestamp_ms();
        self.expires_at.saturating_sub(now)
    }
}

// == Utility Functions ==
/// Current wall-clock time as Unix milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
