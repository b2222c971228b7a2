//! Cache Core
//!
//! TTL expiration, LRU eviction, deterministic key derivation and
//! pattern-based TTL strategies, fronted by an async manager.

mod entry;
mod key;
mod manager;
mod recency;
mod stats;
mod store;
mod strategy;

#[cfg(test)]
mod property_tests;

pub use entry::CacheEntry;
pub use key::KeyCodec;
pub use manager::{CacheManager, ConfigReport, DebugReport, EntryReport, FetchOptions};
pub use recency::RecencyList;
pub use stats::CacheStats;
pub use store::{CacheStore, Weigher};

// == Public Constants ==
/// Longest key stored verbatim; longer keys are replaced by a digest
pub const MAX_KEY_LENGTH: usize = 256;
