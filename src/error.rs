//! Error types for the cache library
//!
//! One thiserror enum covers every failure the crate can report; most
//! variants are absorbed internally and only surface in logs.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache library.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A value could not be serialized into a cache key
    #[error("Key encoding failed: {0}")]
    KeyEncoding(String),

    /// The storage backend failed to read an entry
    #[error("Storage read failed: {0}")]
    StorageRead(String),

    /// The storage backend failed to persist an entry
    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    /// A caller-supplied computation failed and no fallback applied
    #[error("Computation failed: {0}")]
    Compute(#[source] anyhow::Error),

    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache library.
pub type Result<T> = std::result::Result<T, CacheError>;
