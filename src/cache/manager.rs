//! Cache Manager Module
//!
//! The public async facade over the cache store: lookups, writes,
//! compute-through reads with stale fallback, bulk invalidation and
//! diagnostics. Managers are constructed explicitly from a config and shared
//! behind an `Arc` by the embedding application.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::{BackendKind, DiskBackend, MemoryBackend, StorageBackend};
use crate::cache::entry::current_timestamp_ms;
use crate::cache::key::KeyCodec;
use crate::cache::stats::CacheStats;
use crate::cache::store::{CacheStore, Weigher};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_sweep_task;

// == Fetch Options ==
/// Options for [`CacheManager::get_or_fetch_with`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// TTL for a freshly computed value; strategies and the default apply
    /// when absent
    pub ttl: Option<Duration>,
    /// Serve an expired entry when the computation fails
    pub fallback_to_expired: bool,
}

// == Cache Manager ==
/// Async cache facade with TTL expiry, LRU eviction and compute-through
/// reads.
///
/// All state lives behind an `Arc<RwLock<CacheStore>>`, so every method
/// takes `&self` and the manager can be shared across tasks. Construction
/// spawns the background expiry sweep; dropping the manager or calling
/// [`shutdown`](CacheManager::shutdown) stops it.
pub struct CacheManager<V> {
    /// Shared cache store
    store: Arc<RwLock<CacheStore<V>>>,
    /// Key derivation and namespace translation
    codec: KeyCodec,
    /// The configuration this manager was built from
    config: CacheConfig,
    /// Per-key gates collapsing concurrent computations
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Background expiry sweep
    sweep_handle: JoinHandle<()>,
}

impl<V> CacheManager<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a manager with the backend selected by `config.backend`.
    ///
    /// Values are weighed by their serialized JSON length, matching what the
    /// durable backend writes. Must be called within a tokio runtime.
    ///
    /// # Returns
    /// The manager, or `CacheError::InvalidConfig` when the config violates
    /// an invariant, or `CacheError::StorageWrite` when the durable cache
    /// directory cannot be created.
    pub fn new(config: CacheConfig) -> Result<Self> {
        let backend: Box<dyn StorageBackend<V>> = match config.backend {
            BackendKind::Volatile => Box::new(MemoryBackend::new()),
            BackendKind::Durable => Box::new(DiskBackend::new(
                &config.cache_dir,
                &config.key_namespace,
            )?),
        };
        Self::with_backend(config, backend, Box::new(serialized_size::<V>))
    }
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Volatile Constructor ==
    /// Creates a manager over an in-memory backend regardless of
    /// `config.backend`.
    ///
    /// Available for value types that cannot be serialized; values are
    /// weighed shallowly with `size_of_val`.
    pub fn volatile(config: CacheConfig) -> Result<Self> {
        Self::with_backend(
            config,
            Box::new(MemoryBackend::new()),
            Box::new(|value: &V| std::mem::size_of_val(value)),
        )
    }

    // == Backend Injection ==
    /// Creates a manager over an explicit backend and weigher.
    ///
    /// This is the seam tests and embedders use to supply alternate storage.
    pub fn with_backend(
        config: CacheConfig,
        backend: Box<dyn StorageBackend<V>>,
        weigher: Weigher<V>,
    ) -> Result<Self> {
        config.validate()?;

        let kind = backend.kind();
        let codec = KeyCodec::new(config.key_namespace.clone());
        let store = Arc::new(RwLock::new(CacheStore::new(
            backend,
            codec.clone(),
            config.max_entries,
            config.default_ttl,
            weigher,
        )));
        let sweep_handle = spawn_sweep_task(Arc::clone(&store), config.sweep_interval);

        info!(
            "Cache manager started: {} backend, capacity {}, default TTL {}s",
            kind,
            config.max_entries,
            config.default_ttl.as_secs()
        );

        Ok(Self {
            store,
            codec,
            config,
            in_flight: Mutex::new(HashMap::new()),
            sweep_handle,
        })
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are treated as absent: they are removed on the spot,
    /// counted as an eviction and the lookup as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let storage_key = self.codec.storage_key(key);
        // Write lock: a hit updates recency and counters
        self.store.write().await.get(&storage_key)
    }

    // == Set ==
    /// Stores a value under `key` with the configured TTL resolution
    /// (matching strategy first, default TTL otherwise).
    pub async fn set(&self, key: &str, value: V) {
        let storage_key = self.codec.storage_key(key);
        self.store.write().await.set(storage_key, value, None);
    }

    /// Stores a value under `key` with an explicit TTL, bypassing
    /// strategies and the default.
    pub async fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let storage_key = self.codec.storage_key(key);
        self.store.write().await.set(storage_key, value, Some(ttl));
    }

    // == Has ==
    /// Returns whether a live value exists for `key`.
    ///
    /// Same expiry check as `get`, but with no side effects: no counters,
    /// no access metadata, no removal.
    pub async fn has(&self, key: &str) -> bool {
        let storage_key = self.codec.storage_key(key);
        self.store.read().await.contains_live(&storage_key)
    }

    // == Delete ==
    /// Removes the entry under `key`, returning whether one was present.
    pub async fn delete(&self, key: &str) -> bool {
        let storage_key = self.codec.storage_key(key);
        self.store.write().await.delete(&storage_key)
    }

    // == Get Or Fetch ==
    /// Returns the cached value for `key`, computing and caching it on a
    /// miss.
    ///
    /// Concurrent calls for the same key are collapsed: one caller runs
    /// `compute`, the others wait and reuse its result.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        self.get_or_fetch_with(key, compute, FetchOptions::default())
            .await
    }

    /// Like [`get_or_fetch`](CacheManager::get_or_fetch), with explicit
    /// options.
    ///
    /// When `compute` fails and `fallback_to_expired` is set, an expired
    /// entry still present for the key is served instead of the error.
    /// Otherwise the error is propagated unchanged inside
    /// [`CacheError::Compute`].
    pub async fn get_or_fetch_with<F, Fut>(
        &self,
        key: &str,
        compute: F,
        options: FetchOptions,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        let storage_key = self.codec.storage_key(key);

        // Fast path: a live value needs no computation
        if let Some(value) = self.store.write().await.lookup_live(&storage_key, true) {
            return Ok(value);
        }

        // One caller per key computes; the rest wait here
        let gate = self.gate_for(&storage_key).await;
        let _permit = gate.lock().await;

        // The computation may have settled while we waited on the gate
        if let Some(value) = self.store.write().await.lookup_live(&storage_key, false) {
            return Ok(value);
        }

        match compute().await {
            Ok(value) => {
                self.store
                    .write()
                    .await
                    .set(storage_key.clone(), value.clone(), options.ttl);
                self.clear_gate(&storage_key).await;
                Ok(value)
            }
            Err(err) => {
                self.clear_gate(&storage_key).await;
                if options.fallback_to_expired {
                    if let Some(stale) = self.store.read().await.stale_read(&storage_key) {
                        warn!(
                            "Serving stale value for {} after compute failure: {}",
                            key, err
                        );
                        return Ok(stale);
                    }
                }
                Err(CacheError::Compute(err))
            }
        }
    }

    /// Returns the per-key gate, creating it on first use.
    async fn gate_for(&self, storage_key: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        in_flight
            .entry(storage_key.to_string())
            .or_default()
            .clone()
    }

    /// Drops a settled computation's gate.
    async fn clear_gate(&self, storage_key: &str) {
        self.in_flight.lock().await.remove(storage_key);
    }

    // == Refresh ==
    /// Forces recomputation: deletes any current entry, then computes and
    /// caches a fresh value.
    pub async fn refresh<F, Fut>(&self, key: &str, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        self.refresh_with(key, compute, FetchOptions::default())
            .await
    }

    /// Like [`refresh`](CacheManager::refresh), with explicit options.
    ///
    /// The TTL option applies to the recomputed value. Because the current
    /// entry is deleted up front, `fallback_to_expired` has nothing left to
    /// serve when the computation fails.
    pub async fn refresh_with<F, Fut>(
        &self,
        key: &str,
        compute: F,
        options: FetchOptions,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        let storage_key = self.codec.storage_key(key);
        self.store.write().await.delete(&storage_key);
        self.get_or_fetch_with(key, compute, options).await
    }

    // == Invalidate Pattern ==
    /// Removes every entry whose caller-visible key matches `pattern`.
    ///
    /// # Returns
    /// The number of entries removed.
    pub async fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        self.store.write().await.invalidate_matching(pattern)
    }

    // == Set Strategy ==
    /// Registers a pattern to TTL strategy for writes without an explicit
    /// TTL.
    ///
    /// Strategies are consulted in registration order and the first match
    /// wins, so an existing pattern cannot be re-tuned by registering it
    /// again.
    pub async fn set_strategy(&self, pattern: Regex, ttl: Duration) {
        self.store.write().await.add_strategy(pattern, ttl);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Clear ==
    /// Empties the cache and resets every counter.
    pub async fn clear(&self) {
        self.store.write().await.clear();
        info!("Cache cleared");
    }

    // == Config ==
    /// Returns the configuration the manager was built from.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Key Derivation ==
    /// Derives the canonical caller-visible key for a structured value.
    ///
    /// Structurally equal values produce identical keys. The result feeds
    /// the normal key-based operations.
    pub fn key_for<T: Serialize>(&self, value: &T) -> Result<String> {
        self.codec.value_key(value)
    }

    // == Debug Report ==
    /// Produces a read-only diagnostic snapshot: active configuration,
    /// statistics and per-entry metadata.
    ///
    /// The snapshot is not transactional with respect to concurrent
    /// writers; it observes without modifying.
    pub async fn debug_report(&self) -> DebugReport {
        let store = self.store.read().await;
        let stats = store.stats();
        let hit_rate = stats.hit_rate();
        let entries = store
            .entries()
            .into_iter()
            .map(|(key, entry)| EntryReport {
                key: store.codec().strip(&key).to_string(),
                created_at: format_timestamp(entry.created_at),
                expires_at: format_timestamp(entry.expires_at),
                last_accessed_at: format_timestamp(entry.last_accessed_at),
                access_count: entry.access_count,
                size_estimate_bytes: entry.size_estimate,
                ttl_remaining_ms: entry.ttl_remaining_ms(),
                expired: entry.is_expired(),
            })
            .collect();

        DebugReport {
            generated_at: format_timestamp(current_timestamp_ms()),
            backend: store.backend_kind(),
            config: ConfigReport {
                max_entries: self.config.max_entries,
                default_ttl_secs: self.config.default_ttl.as_secs(),
                key_namespace: self.config.key_namespace.clone(),
                cache_dir: self.config.cache_dir.display().to_string(),
                sweep_interval_secs: self.config.sweep_interval.as_secs(),
            },
            strategies: store.strategy_count(),
            stats,
            hit_rate,
            entries,
        }
    }

    // == Shutdown ==
    /// Stops the background sweep task.
    ///
    /// Entries need no teardown of their own: durable backends persist on
    /// every write. Dropping the manager has the same effect.
    pub fn shutdown(&self) {
        self.sweep_handle.abort();
        info!("Cache manager shut down");
    }
}

impl<V> Drop for CacheManager<V> {
    fn drop(&mut self) {
        self.sweep_handle.abort();
    }
}

/// Default weigher: the serialized JSON length of the value.
fn serialized_size<V: Serialize>(value: &V) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

// == Debug Report Types ==
/// Read-only diagnostic snapshot of a cache manager.
#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    /// When the snapshot was taken (RFC 3339)
    pub generated_at: String,
    /// Storage class of the active backend
    pub backend: BackendKind,
    /// Active configuration values
    pub config: ConfigReport,
    /// Number of registered TTL strategies
    pub strategies: usize,
    /// Counter snapshot
    pub stats: CacheStats,
    /// Derived hit rate at snapshot time
    pub hit_rate: f64,
    /// Per-entry metadata, sorted by key
    pub entries: Vec<EntryReport>,
}

/// Configuration values echoed into the debug report.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub max_entries: usize,
    pub default_ttl_secs: u64,
    pub key_namespace: String,
    pub cache_dir: String,
    pub sweep_interval_secs: u64,
}

/// Diagnostic metadata for a single entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    /// Caller-visible key
    pub key: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Expiration time (RFC 3339)
    pub expires_at: String,
    /// Last access time (RFC 3339)
    pub last_accessed_at: String,
    /// Reads recorded against the entry
    pub access_count: u64,
    /// Approximate value size in bytes
    pub size_estimate_bytes: usize,
    /// Milliseconds until expiry, clamped to zero
    pub ttl_remaining_ms: u64,
    /// Whether the entry is already logically absent
    pub expired: bool,
}

/// Formats Unix milliseconds as RFC 3339 for human consumption.
fn format_timestamp(ms: u64) -> String {
    Utc.timestamp_millis_opt(ms as i64)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| format!("{}ms", ms))
}
