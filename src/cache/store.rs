//! Cache Store
//!
//! The synchronous engine: one backend plus recency order, TTL bookkeeping,
//! strategy-derived TTLs and counters. The async manager composes it.

use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::backend::{BackendKind, StorageBackend};
use crate::cache::entry::CacheEntry;
use crate::cache::key::KeyCodec;
use crate::cache::recency::RecencyList;
use crate::cache::stats::CacheStats;
use crate::cache::strategy::StrategySet;

// == Weigher ==
/// Measures a value's approximate footprint in bytes at insert time.
pub type Weigher<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;

// == Cache Store ==
/// Synchronous cache engine over a pluggable backend.
///
/// The store is synchronous; the manager wraps it in an `RwLock` and decides
/// locking granularity. Storage failures never escape: failed writes are
/// logged and absorbed, failed reads count as absent entries.
pub struct CacheStore<V> {
    /// Entry storage, volatile or durable
    backend: Box<dyn StorageBackend<V>>,
    /// Translates between storage keys and caller-visible keys
    codec: KeyCodec,
    /// Access order for LRU eviction
    recency: RecencyList,
    /// Usage counters
    stats: CacheStats,
    /// Pattern-derived TTLs for writes without an explicit TTL
    strategies: StrategySet,
    /// Entry capacity
    max_entries: usize,
    /// TTL for entries when neither an override nor a strategy applies
    default_ttl: Duration,
    /// Sizes values for the memory usage gauge
    weigher: Weigher<V>,
    /// Running total of entry size estimates
    memory_usage_bytes: usize,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore over the given backend.
    ///
    /// Whatever the backend already holds is indexed up front, so a durable
    /// backend keeps its recency order and size accounting across restarts.
    ///
    /// # Arguments
    /// * `backend` - Storage the entries live in
    /// * `codec` - Key codec matching the manager's namespace
    /// * `max_entries` - Entry capacity
    /// * `default_ttl` - TTL applied when no override or strategy matches
    /// * `weigher` - Value size measure for the memory usage gauge
    pub fn new(
        backend: Box<dyn StorageBackend<V>>,
        codec: KeyCodec,
        max_entries: usize,
        default_ttl: Duration,
        weigher: Weigher<V>,
    ) -> Self {
        let mut store = Self {
            backend,
            codec,
            recency: RecencyList::new(),
            stats: CacheStats::new(),
            strategies: StrategySet::new(),
            max_entries,
            default_ttl,
            weigher,
            memory_usage_bytes: 0,
        };
        store.restore_index();
        store
    }

    /// Rebuilds the recency order and size accounting from the backend's
    /// current contents.
    fn restore_index(&mut self) {
        let keys = self.backend.keys();
        if keys.is_empty() {
            return;
        }

        let mut seen = Vec::with_capacity(keys.len());
        let mut bytes = 0usize;
        for key in keys {
            if let Some(entry) = self.backend.read(&key) {
                bytes = bytes.saturating_add(entry.size_estimate);
                seen.push((key, entry.last_accessed_at));
            }
        }

        info!(
            "Restored {} entries from the {} backend",
            seen.len(),
            self.backend.kind()
        );
        self.memory_usage_bytes = bytes;
        self.recency.rebuild(seen);
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// The effective TTL is the explicit override if given, otherwise the
    /// first matching strategy, otherwise the default. If the key already
    /// exists, the value is overwritten and the TTL is reset. If the cache is
    /// at capacity, least recently used entries are evicted first.
    ///
    /// Backend write failures are logged and absorbed; the entry is simply
    /// not cached.
    ///
    /// # Arguments
    /// * `key` - The storage key to write under
    /// * `value` - Payload to cache
    /// * `ttl_override` - Explicit TTL taking precedence over strategies
    pub fn set(&mut self, key: String, value: V, ttl_override: Option<Duration>) {
        let effective_ttl = ttl_override
            .or_else(|| self.strategies.ttl_for(self.codec.strip(&key)))
            .unwrap_or(self.default_ttl);

        let size = (self.weigher)(&value);
        let previous_size = self.backend.read(&key).map(|e| e.size_estimate);

        // If not overwriting and at capacity, evict coldest entries
        if previous_size.is_none() {
            while self.backend.len() >= self.max_entries {
                let coldest = match self.recency.pop_coldest() {
                    Some(coldest) => coldest,
                    None => break,
                };
                let evicted_size = self.backend.read(&coldest).map(|e| e.size_estimate);
                if self.backend.remove(&coldest) {
                    self.memory_usage_bytes = self
                        .memory_usage_bytes
                        .saturating_sub(evicted_size.unwrap_or(0));
                    self.stats.record_eviction();
                    debug!("Evicted least recently used key {}", coldest);
                } else {
                    // Skip the stuck candidate and try the next coldest; the
                    // draining recency queue keeps the loop bounded
                    warn!("Could not evict {} from the backend", coldest);
                }
            }
        }

        let entry = CacheEntry::new(value, effective_ttl, size);
        match self.backend.write(&key, entry) {
            Ok(()) => {
                self.memory_usage_bytes = self
                    .memory_usage_bytes
                    .saturating_sub(previous_size.unwrap_or(0))
                    .saturating_add(size);
                self.recency.touch(&key);
                self.stats.record_set();
            }
            Err(e) => {
                warn!("Failed to persist entry for {}: {}", key, e);
            }
        }
    }

    // == Get ==
    /// Looks up a live value.
    ///
    /// Returns the value if present and not expired, updating access
    /// metadata and the hit counter. An expired entry is removed on the
    /// spot; the removal counts as an eviction and the lookup as a miss.
    ///
    /// # Arguments
    /// * `key` - The storage key to retrieve
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.backend.read(key) {
            Some(entry) => {
                if entry.is_expired() {
                    self.remove_physical(key, entry.size_estimate);
                    self.stats.record_eviction();
                    self.stats.record_miss();
                    debug!("Evicted expired key {} on read", key);
                    return None;
                }
                let value = self.record_access(key, entry);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Lookup Live ==
    /// Returns the live value for `key` without disturbing expired entries.
    ///
    /// Used by the compute path: an expired entry must stay in place so a
    /// failed computation can still fall back to it. When `record` is false
    /// the lookup leaves the hit and miss counters alone, which keeps
    /// post-computation re-checks out of the statistics.
    pub fn lookup_live(&mut self, key: &str, record: bool) -> Option<V> {
        match self.backend.read(key) {
            Some(entry) if !entry.is_expired() => {
                let value = self.record_access(key, entry);
                if record {
                    self.stats.record_hit();
                }
                Some(value)
            }
            _ => {
                if record {
                    self.stats.record_miss();
                }
                None
            }
        }
    }

    /// Touches an entry, persists its metadata and refreshes recency.
    fn record_access(&mut self, key: &str, mut entry: CacheEntry<V>) -> V {
        entry.touch();
        let value = entry.value.clone();
        if let Err(e) = self.backend.write(key, entry) {
            warn!("Failed to persist access metadata for {}: {}", key, e);
        }
        self.recency.touch(key);
        value
    }

    // == Contains Live ==
    /// Returns whether a live entry exists for `key`.
    ///
    /// Purely observational: no access metadata or counters change.
    pub fn contains_live(&self, key: &str) -> bool {
        self.backend
            .read(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // == Stale Read ==
    /// Returns whatever value is physically present for `key`, expired or
    /// not, without touching metadata or counters.
    pub fn stale_read(&self, key: &str) -> Option<V> {
        self.backend.read(key).map(|entry| entry.value)
    }

    // == Delete ==
    /// Explicitly removes one entry.
    ///
    /// # Returns
    /// `true` if an entry was present and removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let size = self
            .backend
            .read(key)
            .map(|entry| entry.size_estimate)
            .unwrap_or(0);
        if self.remove_physical(key, size) {
            self.stats.record_delete();
            true
        } else {
            false
        }
    }

    /// Removes an entry from the backend and the recency order, adjusting
    /// the size gauge.
    fn remove_physical(&mut self, key: &str, size_estimate: usize) -> bool {
        if self.backend.remove(key) {
            self.recency.remove(key);
            self.memory_usage_bytes = self.memory_usage_bytes.saturating_sub(size_estimate);
            true
        } else {
            false
        }
    }

    // == Invalidate Matching ==
    /// Removes every entry whose caller-visible key matches `pattern`.
    ///
    /// Each removal counts as a delete.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn invalidate_matching(&mut self, pattern: &Regex) -> usize {
        let mut removed = 0;
        for key in self.backend.keys() {
            if !pattern.is_match(self.codec.strip(&key)) {
                continue;
            }
            if self.delete(&key) {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("Invalidated {} entries matching {}", removed, pattern);
        }
        removed
    }

    // == Cleanup Expired ==
    /// Sweeps out every expired entry.
    ///
    /// Each removal counts as an eviction.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let mut removed = 0;
        for key in self.backend.keys() {
            let entry = match self.backend.read(&key) {
                Some(entry) => entry,
                None => continue,
            };
            if !entry.is_expired() {
                continue;
            }
            if self.remove_physical(&key, entry.size_estimate) {
                self.stats.record_eviction();
                removed += 1;
            }
        }
        removed
    }

    // == Strategies ==
    /// Registers a pattern to TTL strategy.
    ///
    /// Strategies are consulted in registration order on writes without an
    /// explicit TTL; the first matching pattern wins.
    pub fn add_strategy(&mut self, pattern: Regex, ttl: Duration) {
        self.strategies.add(pattern, ttl);
    }

    /// Returns the number of registered strategies.
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    // == Stats ==
    /// Snapshot of the usage counters with the entry and size gauges
    /// filled in from the backend.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.backend.len();
        stats.max_entries = self.max_entries;
        stats.memory_usage_bytes = self.memory_usage_bytes;
        stats
    }

    // == Entries Snapshot ==
    /// Returns every entry with its storage key, sorted by key.
    ///
    /// Diagnostic surface for the debug report; access metadata is left
    /// untouched.
    pub fn entries(&self) -> Vec<(String, CacheEntry<V>)> {
        let mut entries: Vec<(String, CacheEntry<V>)> = self
            .backend
            .keys()
            .into_iter()
            .filter_map(|key| self.backend.read(&key).map(|entry| (key, entry)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    // == Backend Kind ==
    /// Reports which class of storage backs this store.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    // == Key Codec ==
    /// Returns the codec used for namespace translation.
    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    // == Clear ==
    /// Empties the cache and resets every counter.
    pub fn clear(&mut self) {
        self.backend.clear();
        self.recency.clear();
        self.stats.reset();
        self.memory_usage_bytes = 0;
    }

    // == Length ==
    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
