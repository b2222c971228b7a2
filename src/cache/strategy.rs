//! TTL Strategy Module
//!
//! Maps key patterns to TTLs so callers can tune expiry per key family
//! without threading a TTL through every write.

use std::time::Duration;

use regex::Regex;

// == TTL Strategy ==
/// A single pattern to TTL rule.
#[derive(Debug, Clone)]
pub struct TtlStrategy {
    /// Pattern matched against the caller-visible key
    pub pattern: Regex,
    /// TTL applied to matching keys
    pub ttl: Duration,
}

// == Strategy Set ==
/// Ordered strategy table consulted on writes without an explicit TTL.
///
/// Strategies are checked in registration order and the first matching
/// pattern wins, so broad patterns registered early shadow narrower ones
/// registered later.
#[derive(Debug, Default)]
pub struct StrategySet {
    strategies: Vec<TtlStrategy>,
}

impl StrategySet {
    // == Constructor ==
    /// Creates an empty strategy table.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    // == Add ==
    /// Appends a strategy to the table.
    pub fn add(&mut self, pattern: Regex, ttl: Duration) {
        self.strategies.push(TtlStrategy { pattern, ttl });
    }

    // == TTL Lookup ==
    /// Returns the TTL of the first strategy matching `key`, if any.
    pub fn ttl_for(&self, key: &str) -> Option<Duration> {
        self.strategies
            .iter()
            .find(|s| s.pattern.is_match(key))
            .map(|s| s.ttl)
    }

    // == Length ==
    /// Returns the number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn re(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = StrategySet::new();
        assert_eq!(set.ttl_for("page:home"), None);
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_first_match_wins() {
        let mut set = StrategySet::new();
        set.add(re("^page:"), Duration::from_secs(60));
        set.add(re("^page:home$"), Duration::from_secs(600));

        // The broader pattern was registered first, so it shadows the
        // narrower one
        assert_eq!(set.ttl_for("page:home"), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_non_matching_key_falls_through() {
        let mut set = StrategySet::new();
        set.add(re("^thumb:"), Duration::from_secs(30));

        assert_eq!(set.ttl_for("page:home"), None);
        assert_eq!(set.ttl_for("thumb:small"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let mut set = StrategySet::new();
        set.add(re("^a:"), Duration::from_secs(1));
        set.add(re("^b:"), Duration::from_secs(2));
        set.add(re(":tail$"), Duration::from_secs(3));

        assert_eq!(set.len(), 3);
        assert_eq!(set.ttl_for("b:x"), Some(Duration::from_secs(2)));
        // "a:tail" matches both the first and third strategy; first wins
        assert_eq!(set.ttl_for("a:tail"), Some(Duration::from_secs(1)));
    }
}
