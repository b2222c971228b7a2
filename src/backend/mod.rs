//! Storage Backend Module
//!
//! Defines the uniform storage contract cache entries live behind, plus the
//! volatile and durable implementations.

pub mod disk;
pub mod memory;

pub use disk::DiskBackend;
pub use memory::MemoryBackend;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

// == Backend Kind ==
/// Which class of storage a backend writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-lifetime storage, lost on restart
    Volatile,
    /// Storage that survives process restarts
    Durable,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Volatile => write!(f, "volatile"),
            BackendKind::Durable => write!(f, "durable"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "volatile" => Ok(BackendKind::Volatile),
            "durable" => Ok(BackendKind::Durable),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown backend kind: {other}"
            ))),
        }
    }
}

// == Storage Backend Trait ==
/// Uniform contract for the stores entries live in.
///
/// The cache core only talks to storage through this interface, so volatile
/// and durable backends stay interchangeable and tests can inject their own.
/// Implementations are synchronous; the async facade serializes access with
/// its own locking.
///
/// Durable implementations are best-effort: a failed write surfaces as an
/// error the cache layer absorbs, and a failed or corrupt read is reported
/// as an absent entry.
pub trait StorageBackend<V>: Send + Sync {
    /// Reads the entry stored under `key`, if any.
    fn read(&self, key: &str) -> Option<CacheEntry<V>>;

    /// Writes `entry` under `key`, overwriting any previous entry.
    fn write(&mut self, key: &str, entry: CacheEntry<V>) -> Result<()>;

    /// Removes the entry under `key`, returning whether one was present.
    fn remove(&mut self, key: &str) -> bool;

    /// Returns every stored key.
    fn keys(&self) -> Vec<String>;

    /// Returns the number of stored entries.
    fn len(&self) -> usize;

    /// Removes every stored entry.
    fn clear(&mut self);

    /// Reports which class of storage this backend writes to.
    fn kind(&self) -> BackendKind;
}
