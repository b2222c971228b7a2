//! Property Tests
//!
//! Drives the store, key codec and statistics through generated operation
//! sequences and checks them against a reference model.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tokio::sync::RwLock;

use crate::backend::MemoryBackend;
use crate::cache::{CacheStore, KeyCodec, MAX_KEY_LENGTH};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(300);

fn test_store(max_entries: usize) -> CacheStore<String> {
    CacheStore::new(
        Box::new(MemoryBackend::new()),
        KeyCodec::new(""),
        max_entries,
        TEST_DEFAULT_TTL,
        Box::new(|value: &String| value.len()),
    )
}

// == Strategies ==
/// Keys short enough to be stored verbatim rather than digested
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,48}"
}

/// Printable payloads of assorted lengths
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!-]{1,200}"
}

#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

/// Weighted towards writes so sequences actually fill the store
fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| StoreOp::Set { key, value }),
        2 => key_strategy().prop_map(|key| StoreOp::Get { key }),
        1 => key_strategy().prop_map(|key| StoreOp::Delete { key }),
    ]
}

// == Reference Model Properties ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Property: for any sequence of operations, hits, misses, sets and
    // deletes match a reference model, and reads return exactly the last
    // value written. Nothing expires mid-run with a 300 second TTL.
    #[test]
    fn prop_counters_match_reference_model(ops in prop::collection::vec(store_op_strategy(), 1..50)) {
        let mut store = test_store(TEST_MAX_ENTRIES);
        let mut model: HashMap<String, String> = HashMap::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;
        let mut expected_sets: u64 = 0;
        let mut expected_deletes: u64 = 0;

        for op in ops {
            match op {
                StoreOp::Set { key, value } => {
                    store.set(key.clone(), value.clone(), None);
                    model.insert(key, value);
                    expected_sets += 1;
                }
                StoreOp::Get { key } => {
                    let result = store.get(&key);
                    match model.get(&key) {
                        Some(expected) => {
                            expected_hits += 1;
                            prop_assert_eq!(result.as_ref(), Some(expected), "read disagrees with model");
                        }
                        None => {
                            expected_misses += 1;
                            prop_assert!(result.is_none(), "read produced a value the model lacks");
                        }
                    }
                }
                StoreOp::Delete { key } => {
                    let removed = store.delete(&key);
                    let model_removed = model.remove(&key).is_some();
                    prop_assert_eq!(removed, model_removed, "delete outcome disagrees with model");
                    if model_removed {
                        expected_deletes += 1;
                    }
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "hit counter drifted from model");
        prop_assert_eq!(stats.misses, expected_misses, "miss counter drifted from model");
        prop_assert_eq!(stats.sets, expected_sets, "set counter drifted from model");
        prop_assert_eq!(stats.deletes, expected_deletes, "delete counter drifted from model");
        prop_assert_eq!(stats.total_entries, model.len(), "entry count drifted from model");
    }

    // Property: the second write under a key fully replaces the first, and
    // the memory gauge follows the replacement.
    #[test]
    fn prop_read_returns_last_write(
        key in key_strategy(),
        first in value_strategy(),
        second in value_strategy()
    ) {
        let mut store = test_store(TEST_MAX_ENTRIES);

        store.set(key.clone(), first, None);
        store.set(key.clone(), second.clone(), None);

        prop_assert_eq!(store.len(), 1, "overwrite must not grow the store");
        prop_assert_eq!(store.stats().memory_usage_bytes, second.len(), "gauge must track the surviving value");
        prop_assert_eq!(store.get(&key), Some(second), "read must see the later write");
    }

    // Property: delete reports whether something was removed, and a removed
    // key reads as absent.
    #[test]
    fn prop_delete_then_read_misses(key in key_strategy(), value in value_strategy()) {
        let mut store = test_store(TEST_MAX_ENTRIES);

        store.set(key.clone(), value, None);
        prop_assert!(store.delete(&key), "first delete must find the entry");
        prop_assert!(store.get(&key).is_none(), "deleted key must read as absent");
        prop_assert!(!store.delete(&key), "second delete must find nothing");
    }

    // Property: the number of entries never exceeds the configured capacity,
    // no matter the write sequence.
    #[test]
    fn prop_writes_never_exceed_capacity(
        writes in prop::collection::vec((key_strategy(), value_strategy()), 1..150)
    ) {
        let capacity = 32;
        let mut store = test_store(capacity);

        for (key, value) in writes {
            store.set(key, value, None);
            prop_assert!(
                store.len() <= capacity,
                "store holds {} entries with capacity {}",
                store.len(),
                capacity
            );
        }
    }

    // Property: an entry written with a zero TTL is already expired, so a
    // read misses, removes it and counts an eviction, while a long-lived
    // sibling written alongside it survives.
    #[test]
    fn prop_expired_entries_read_as_absent(
        key1 in key_strategy(),
        key2 in key_strategy(),
        value in value_strategy()
    ) {
        prop_assume!(key1 != key2);

        let mut store = test_store(TEST_MAX_ENTRIES);

        store.set(key1.clone(), value.clone(), Some(Duration::ZERO));
        store.set(key2.clone(), value.clone(), Some(Duration::from_secs(300)));

        prop_assert!(store.get(&key1).is_none(), "expired entry must read as absent");
        prop_assert_eq!(store.get(&key2), Some(value), "live sibling must survive");

        let stats = store.stats();
        prop_assert_eq!(stats.evictions, 1, "expired read must count one eviction");
        prop_assert_eq!(stats.misses, 1, "expired read must count one miss");
        prop_assert_eq!(stats.total_entries, 1, "only the live entry may remain");
    }
}

// == Eviction Order Properties ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Property: when a write pushes the store past capacity, the entry
    // written earliest and never read again is the one reclaimed.
    #[test]
    fn prop_eviction_picks_the_coldest_key(
        initial in prop::collection::hash_set(key_strategy(), 2..9),
        new_key in key_strategy(),
        new_value in value_strategy()
    ) {
        prop_assume!(!initial.contains(&new_key));

        // Fix a write order; the first key becomes the eviction candidate
        let mut keys: Vec<String> = initial.into_iter().collect();
        keys.sort();
        let coldest = keys[0].clone();

        let capacity = keys.len();
        let mut store = test_store(capacity);
        for key in &keys {
            store.set(key.clone(), format!("value_{}", key), None);
        }
        prop_assert_eq!(store.len(), capacity, "store must sit exactly at capacity");

        store.set(new_key.clone(), new_value, None);

        prop_assert_eq!(store.len(), capacity, "eviction must keep the store at capacity");
        prop_assert!(store.get(&coldest).is_none(), "coldest key '{}' must be gone", coldest);
        prop_assert!(store.get(&new_key).is_some(), "new key '{}' must be present", new_key);
        for key in keys.iter().skip(1) {
            prop_assert!(store.get(key).is_some(), "warmer key '{}' must survive", key);
        }
    }

    // Property: reading a key refreshes its recency, so the next eviction
    // reclaims the runner-up instead.
    #[test]
    fn prop_read_shields_a_key_from_eviction(
        initial in prop::collection::hash_set(key_strategy(), 3..8),
        new_key in key_strategy(),
        new_value in value_strategy()
    ) {
        prop_assume!(!initial.contains(&new_key));

        let mut keys: Vec<String> = initial.into_iter().collect();
        keys.sort();

        let capacity = keys.len();
        let mut store = test_store(capacity);
        for key in &keys {
            store.set(key.clone(), format!("value_{}", key), None);
        }

        // Warm up the would-be victim; its neighbor becomes coldest
        let shielded = keys[0].clone();
        let runner_up = keys[1].clone();
        let _ = store.get(&shielded);

        store.set(new_key.clone(), new_value, None);

        prop_assert!(store.get(&shielded).is_some(), "read key '{}' must not be evicted", shielded);
        prop_assert!(store.get(&runner_up).is_none(), "runner-up '{}' must be evicted", runner_up);
        prop_assert!(store.get(&new_key).is_some(), "new key must be present");
    }
}

// == Key Derivation Properties ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Property: derived keys are deterministic, bounded in length, and
    // distinct payloads with distinct serializations get distinct keys
    // (up to digest collisions, which SHA-256 makes negligible).
    #[test]
    fn prop_value_keys_deterministic_and_bounded(
        html in "[a-zA-Z<>/ ]{0,400}",
        width in 1u32..4000,
    ) {
        let codec = KeyCodec::new("render");

        let payload = (html.clone(), width);
        let key_a = codec.value_key(&payload).unwrap();
        let key_b = codec.value_key(&payload).unwrap();
        prop_assert_eq!(&key_a, &key_b, "equal payloads must derive equal keys");
        prop_assert!(key_a.len() <= MAX_KEY_LENGTH, "derived key exceeds the length bound");

        let other = (html, width + 1);
        let key_c = codec.value_key(&other).unwrap();
        prop_assert_ne!(key_a, key_c, "distinct payloads must derive distinct keys");
    }

    // Property: namespacing is reversible for verbatim keys, so pattern
    // matching sees exactly what the caller wrote.
    #[test]
    fn prop_namespace_strip_roundtrip(key in key_strategy()) {
        let codec = KeyCodec::new("snapshot");

        let storage_key = codec.storage_key(&key);
        prop_assert!(storage_key.starts_with("snapshot:"), "namespace prefix missing");
        prop_assert_eq!(codec.strip(&storage_key), key.as_str(), "strip must undo namespacing");
    }
}

// == Invalidation Properties ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Property: invalidation removes exactly the entries whose keys match
    // the pattern and reports their count; non-matching entries survive.
    #[test]
    fn prop_invalidation_removes_exactly_matches(
        page_suffixes in prop::collection::hash_set("[a-z0-9]{1,16}", 1..10),
        user_suffixes in prop::collection::hash_set("[a-z0-9]{1,16}", 1..10),
    ) {
        let mut store = test_store(TEST_MAX_ENTRIES);

        for suffix in &page_suffixes {
            store.set(format!("page_{}", suffix), "p".to_string(), None);
        }
        for suffix in &user_suffixes {
            store.set(format!("user_{}", suffix), "u".to_string(), None);
        }

        let pattern = Regex::new("^page_").unwrap();
        let removed = store.invalidate_matching(&pattern);

        prop_assert_eq!(removed, page_suffixes.len(), "removal count mismatch");
        for suffix in &page_suffixes {
            prop_assert!(store.get(&format!("page_{}", suffix)).is_none(), "matching key survived");
        }
        for suffix in &user_suffixes {
            prop_assert!(store.get(&format!("user_{}", suffix)).is_some(), "non-matching key removed");
        }
    }
}

// == Concurrency Properties ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Property: under concurrent reads and writes through the manager's
    // locking scheme, the store stays within capacity, the hit rate stays a
    // fraction, and the memory gauge equals the sum of stored entry sizes.
    #[test]
    fn prop_concurrent_tasks_preserve_invariants(
        seed_entries in prop::collection::vec((key_strategy(), value_strategy()), 1..20),
        operations in prop::collection::vec(store_op_strategy(), 10..50)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let store = Arc::new(RwLock::new(test_store(TEST_MAX_ENTRIES)));

            {
                let mut guard = store.write().await;
                for (key, value) in &seed_entries {
                    guard.set(key.clone(), value.clone(), None);
                }
            }

            let handles: Vec<_> = operations
                .into_iter()
                .map(|op| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        match op {
                            StoreOp::Set { key, value } => {
                                store.write().await.set(key, value, None);
                            }
                            StoreOp::Get { key } => {
                                let _ = store.write().await.get(&key);
                            }
                            StoreOp::Delete { key } => {
                                let _ = store.write().await.delete(&key);
                            }
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.await.expect("cache task panicked");
            }

            let guard = store.read().await;
            let stats = guard.stats();

            prop_assert!(
                stats.total_entries <= TEST_MAX_ENTRIES,
                "store exceeded capacity under concurrency"
            );

            let hit_rate = stats.hit_rate();
            prop_assert!(
                (0.0..=1.0).contains(&hit_rate),
                "hit rate {} is not a fraction",
                hit_rate
            );

            let stored_bytes: usize = guard
                .entries()
                .iter()
                .map(|(_, entry)| entry.size_estimate)
                .sum();
            prop_assert_eq!(
                stats.memory_usage_bytes,
                stored_bytes,
                "memory gauge drifted from stored entry sizes"
            );

            Ok(())
        })?;
    }
}

// == Edge Cases ==
mod edge_case_tests {
    use super::*;

    #[test]
    fn test_oversized_key_roundtrips_through_digest() {
        let codec = KeyCodec::new("");
        let mut store = test_store(TEST_MAX_ENTRIES);

        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);
        let storage_key = codec.storage_key(&long_key);
        assert!(storage_key.len() <= MAX_KEY_LENGTH);

        store.set(storage_key.clone(), "value".to_string(), None);
        assert_eq!(store.get(&storage_key).as_deref(), Some("value"));
    }

    #[test]
    fn test_memory_gauge_drops_on_delete() {
        let mut store = test_store(TEST_MAX_ENTRIES);

        store.set("a".to_string(), "12345".to_string(), None);
        store.set("b".to_string(), "123".to_string(), None);
        assert_eq!(store.stats().memory_usage_bytes, 8);

        store.delete("a");
        assert_eq!(store.stats().memory_usage_bytes, 3);

        store.delete("b");
        assert_eq!(store.stats().memory_usage_bytes, 0);
    }
}
