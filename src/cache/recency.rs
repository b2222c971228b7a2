//! Access Recency Tracking
//!
//! Maintains cache keys in access order so capacity eviction can reclaim
//! the entry that has gone unread the longest.

use std::collections::VecDeque;

// == Recency List ==
/// Queue of cache keys ordered by last access.
///
/// The front of the queue holds the coldest key, the back the most recently
/// touched one. Operations scan the queue linearly, which is fine at the
/// capacities this cache targets (tens to low hundreds of entries).
#[derive(Debug, Default)]
pub struct RecencyList {
    queue: VecDeque<String>,
}

impl RecencyList {
    // == Constructor ==
    /// Creates an empty recency list.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Records an access to `key`, making it the warmest entry.
    ///
    /// A key already in the queue is moved to the back rather than
    /// duplicated.
    pub fn touch(&mut self, key: &str) {
        self.remove(key);
        self.queue.push_back(key.to_string());
    }

    // == Remove ==
    /// Drops `key` from the queue. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        self.queue.retain(|k| k != key);
    }

    // == Pop Coldest ==
    /// Removes and returns the key that has gone longest without access,
    /// or None when nothing is tracked.
    pub fn pop_coldest(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    // == Rebuild ==
    /// Replaces the queue with an order reconstructed from persisted
    /// metadata.
    ///
    /// Used when a durable backend outlives the process: each pair is a key
    /// and its last access time in Unix milliseconds. Ties fall back to the
    /// key itself so a restart always rebuilds the same order.
    pub fn rebuild(&mut self, mut accesses: Vec<(String, u64)>) {
        accesses.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        self.queue = accesses.into_iter().map(|(key, _)| key).collect();
    }

    // == Clear ==
    /// Forgets every tracked key.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    // == Inspection ==
    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether `key` is currently tracked.
    #[allow(dead_code)]
    pub fn contains(&self, key: &str) -> bool {
        self.queue.iter().any(|k| k == key)
    }
}
