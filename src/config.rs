//! Cache Configuration
//!
//! Loads cache settings from environment variables and supports pure
//! override application for callers that tune a shared base config.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::BackendKind;
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// Every field has a default; `from_env` overrides them from the
/// environment, `with_overrides` from code.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Capacity in entries; writes past it evict the coldest entry
    pub max_entries: usize,
    /// Default TTL for entries without an explicit or strategy-derived TTL
    pub default_ttl: Duration,
    /// Which storage backend holds the entries
    pub backend: BackendKind,
    /// Namespace prefixed onto every encoded key
    pub key_namespace: String,
    /// Directory holding durable entries (ignored by the volatile backend)
    pub cache_dir: PathBuf,
    /// Background expiry sweep interval
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    ///
    /// # Environment Variables
    /// - `SNAPCACHE_MAX_ENTRIES` - Maximum cache entries (default: 100)
    /// - `SNAPCACHE_DEFAULT_TTL_SECS` - Default TTL in seconds (default: 300)
    /// - `SNAPCACHE_BACKEND` - `volatile` or `durable` (default: volatile)
    /// - `SNAPCACHE_NAMESPACE` - Key namespace prefix (default: empty)
    /// - `SNAPCACHE_CACHE_DIR` - Durable entry directory (default: `<tmp>/snapcache`)
    /// - `SNAPCACHE_SWEEP_INTERVAL_SECS` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env::var("SNAPCACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_entries),
            default_ttl: env::var("SNAPCACHE_DEFAULT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            backend: env::var("SNAPCACHE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
            key_namespace: env::var("SNAPCACHE_NAMESPACE")
                .ok()
                .unwrap_or(defaults.key_namespace),
            cache_dir: env::var("SNAPCACHE_CACHE_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            sweep_interval: env::var("SNAPCACHE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        }
    }

    /// Returns a new config with the given overrides applied.
    ///
    /// The base config is left untouched, so a shared base can hand out
    /// per-consumer variants.
    pub fn with_overrides(&self, overrides: ConfigOverrides) -> Self {
        Self {
            max_entries: overrides.max_entries.unwrap_or(self.max_entries),
            default_ttl: overrides.default_ttl.unwrap_or(self.default_ttl),
            backend: overrides.backend.unwrap_or(self.backend),
            key_namespace: overrides
                .key_namespace
                .unwrap_or_else(|| self.key_namespace.clone()),
            cache_dir: overrides
                .cache_dir
                .unwrap_or_else(|| self.cache_dir.clone()),
            sweep_interval: overrides.sweep_interval.unwrap_or(self.sweep_interval),
        }
    }

    /// Checks the invariants a manager relies on.
    ///
    /// # Returns
    /// An error naming the first rejected field, or Ok.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        if self.default_ttl.is_zero() {
            return Err(CacheError::InvalidConfig(
                "default_ttl must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl: Duration::from_secs(300),
            backend: BackendKind::Volatile,
            key_namespace: String::new(),
            cache_dir: env::temp_dir().join("snapcache"),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Optional per-field overrides for [`CacheConfig::with_overrides`].
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_entries: Option<usize>,
    pub default_ttl: Option<Duration>,
    pub backend: Option<BackendKind>,
    pub key_namespace: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub sweep_interval: Option<Duration>,
}
