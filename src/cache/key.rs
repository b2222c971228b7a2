//! Cache Key Module
//!
//! Derives deterministic cache keys from text or structured values and applies
//! the configured namespace prefix.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

// == Key Codec ==
/// Derives stable cache keys and applies the configured namespace.
///
/// Text keys pass through untouched; keys longer than [`MAX_KEY_LENGTH`] are
/// replaced by a fixed-width digest so backends never see unbounded keys.
/// Structured values go through canonical JSON first, so structurally equal
/// values always land on the same key regardless of construction order.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    namespace: String,
}

impl KeyCodec {
    // == Constructor ==
    /// Creates a codec for the given namespace. An empty namespace disables
    /// prefixing.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    // == Storage Key ==
    /// Turns a caller-visible key into the full storage key.
    ///
    /// Applies the oversized-key digest rule, then the namespace prefix.
    pub fn storage_key(&self, key: &str) -> String {
        self.apply_namespace(digest_if_oversized(key))
    }

    // == Value Key ==
    /// Derives the caller-visible key for any serializable value.
    ///
    /// The value is serialized through a JSON tree whose object keys are
    /// always sorted, so two structurally equal values produce identical keys
    /// regardless of construction order, and any differing field changes the
    /// key. The result feeds the normal key operations, which add the
    /// namespace.
    ///
    /// # Returns
    /// The derived key, or `CacheError::KeyEncoding` when the value cannot be
    /// serialized. Callers treat such values as uncacheable.
    pub fn value_key<T: Serialize>(&self, value: &T) -> Result<String> {
        // Going through Value sorts map keys, which direct serialization of
        // a HashMap would not
        let canonical =
            serde_json::to_value(value).map_err(|e| CacheError::KeyEncoding(e.to_string()))?;
        Ok(digest_if_oversized(&canonical.to_string()))
    }

    // == Strip ==
    /// Removes the namespace prefix, returning the caller-visible key.
    ///
    /// Keys without the prefix come back unchanged, so strategy and
    /// invalidation patterns always match what callers passed in.
    pub fn strip<'a>(&self, key: &'a str) -> &'a str {
        if self.namespace.is_empty() {
            return key;
        }
        key.strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(key)
    }

    fn apply_namespace(&self, key: String) -> String {
        if self.namespace.is_empty() {
            key
        } else {
            format!("{}:{}", self.namespace, key)
        }
    }
}

/// Replaces keys longer than [`MAX_KEY_LENGTH`] bytes with a fixed-width
/// digest form.
fn digest_if_oversized(key: &str) -> String {
    if key.len() <= MAX_KEY_LENGTH {
        return key.to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}
