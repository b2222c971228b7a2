//! In-Memory Backend Module
//!
//! Volatile storage backed by a HashMap, the default backend.

use std::collections::HashMap;

use crate::backend::{BackendKind, StorageBackend};
use crate::cache::CacheEntry;
use crate::error::Result;

// == Memory Backend ==
/// Volatile backend holding entries in process memory.
///
/// Contents live exactly as long as the process. Values are never
/// serialized, so any cloneable type works.
pub struct MemoryBackend<V> {
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V> MemoryBackend<V> {
    // == Constructor ==
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> Default for MemoryBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> StorageBackend<V> for MemoryBackend<V> {
    fn read(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, entry: CacheEntry<V>) -> Result<()> {
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Volatile
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(value: &str) -> CacheEntry<String> {
        CacheEntry::new(value.to_string(), Duration::from_secs(60), value.len())
    }

    #[test]
    fn test_write_read_roundtrip() {
        let mut backend = MemoryBackend::new();
        backend.write("key1", entry("value1")).unwrap();

        let read = backend.read("key1").unwrap();
        assert_eq!(read.value, "value1");
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_read_missing_key() {
        let backend: MemoryBackend<String> = MemoryBackend::new();
        assert!(backend.read("missing").is_none());
    }

    #[test]
    fn test_write_overwrites() {
        let mut backend = MemoryBackend::new();
        backend.write("key1", entry("old")).unwrap();
        backend.write("key1", entry("new")).unwrap();

        assert_eq!(backend.len(), 1);
        assert_eq!(backend.read("key1").unwrap().value, "new");
    }

    #[test]
    fn test_remove() {
        let mut backend = MemoryBackend::new();
        backend.write("key1", entry("value1")).unwrap();

        assert!(backend.remove("key1"));
        assert!(!backend.remove("key1"));
        assert_eq!(backend.len(), 0);
    }

    #[test]
    fn test_keys_and_clear() {
        let mut backend = MemoryBackend::new();
        backend.write("a", entry("1")).unwrap();
        backend.write("b", entry("2")).unwrap();

        let mut keys = backend.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        backend.clear();
        assert_eq!(backend.len(), 0);
        assert!(backend.keys().is_empty());
    }

    #[test]
    fn test_kind() {
        let backend: MemoryBackend<String> = MemoryBackend::new();
        assert_eq!(backend.kind(), BackendKind::Volatile);
    }
}
