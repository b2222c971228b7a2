//! Disk Backend Module
//!
//! Durable storage writing one JSON document per entry, with file names
//! derived from the key's digest. Writes go through a temp file and rename
//! so readers never observe a partial document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::backend::{BackendKind, StorageBackend};
use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

// == Entry Document ==
/// On-disk representation of a single entry.
///
/// The original key travels with the entry because file names only carry
/// its digest.
#[derive(Debug, Serialize, Deserialize)]
struct EntryDocument<V> {
    key: String,
    entry: CacheEntry<V>,
}

// == Disk Backend ==
/// Durable backend persisting entries as JSON documents.
///
/// Every operation is best-effort: failed writes surface as errors for the
/// cache layer to absorb, failed reads degrade to absent entries, and a
/// document that no longer parses is deleted on sight.
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    // == Constructor ==
    /// Creates a backend rooted at `cache_dir`.
    ///
    /// A non-empty `namespace` keeps its documents in an own subdirectory, so
    /// managers sharing a cache directory never enumerate each other's
    /// entries.
    pub fn new(cache_dir: &Path, namespace: &str) -> Result<Self> {
        let root = if namespace.is_empty() {
            cache_dir.to_path_buf()
        } else {
            cache_dir.join(namespace)
        };

        fs::create_dir_all(&root).map_err(|e| {
            CacheError::StorageWrite(format!(
                "cannot create cache directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    /// Returns the document path for a storage key.
    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.root.join(format!("{:x}.json", hasher.finalize()))
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn read_document<V: DeserializeOwned>(&self, path: &Path) -> Option<EntryDocument<V>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read cache document {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => Some(doc),
            Err(e) => {
                // A document that no longer parses is useless; drop it so
                // the slot can be refilled
                warn!(
                    "Removing corrupt cache document {}: {}",
                    path.display(),
                    e
                );
                let _ = fs::remove_file(path);
                None
            }
        }
    }

    fn document_paths(&self) -> Vec<PathBuf> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) => {
                warn!(
                    "Failed to list cache directory {}: {}",
                    self.root.display(),
                    e
                );
                return Vec::new();
            }
        };

        dir.flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect()
    }
}

impl<V: Serialize + DeserializeOwned + Send + Sync> StorageBackend<V> for DiskBackend {
    fn read(&self, key: &str) -> Option<CacheEntry<V>> {
        let path = self.entry_path(key);
        self.read_document::<V>(&path).map(|doc| doc.entry)
    }

    fn write(&mut self, key: &str, entry: CacheEntry<V>) -> Result<()> {
        let path = self.entry_path(key);
        let tmp = Self::tmp_path(&path);

        let doc = EntryDocument {
            key: key.to_string(),
            entry,
        };
        let bytes = serde_json::to_vec(&doc).map_err(|e| {
            CacheError::StorageWrite(format!("cannot serialize entry for {}: {}", key, e))
        })?;

        fs::write(&tmp, &bytes).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CacheError::StorageWrite(format!("cannot write {}: {}", tmp.display(), e))
        })?;

        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CacheError::StorageWrite(format!("cannot persist {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    fn remove(&mut self, key: &str) -> bool {
        let path = self.entry_path(key);
        let _ = fs::remove_file(Self::tmp_path(&path));

        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Failed to remove cache document {}: {}", path.display(), e);
                false
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        self.document_paths()
            .iter()
            .filter_map(|path| self.read_document::<V>(path).map(|doc| doc.key))
            .collect()
    }

    fn len(&self) -> usize {
        self.document_paths().len()
    }

    fn clear(&mut self) {
        for path in self.document_paths() {
            let _ = fs::remove_file(Self::tmp_path(&path));
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove cache document {}: {}", path.display(), e);
                }
            }
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Durable
    }
}
