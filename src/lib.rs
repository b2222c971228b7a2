//! Snapcache - An embeddable caching layer for expensive computations
//!
//! Provides TTL expiration, LRU eviction, deterministic keys for structured
//! requests, volatile and durable storage backends, and compute-through
//! reads that collapse concurrent work for the same key.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use backend::{BackendKind, DiskBackend, MemoryBackend, StorageBackend};
pub use cache::{CacheManager, CacheStats, DebugReport, FetchOptions, KeyCodec};
pub use config::{CacheConfig, ConfigOverrides};
pub use error::{CacheError, Result};
