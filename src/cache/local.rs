//! Local Cache Module
//!
//! In-memory key → value mapping that lives for exactly one request.

use std::collections::HashMap;

use crate::cache::{CacheKey, CacheValue};

// == Local Cache ==
/// Request-scoped cache. No TTL and no eviction; dropped with the request.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: HashMap<CacheKey, CacheValue>,
}

impl LocalCache {
    // == Constructor ==
    /// Creates an empty local cache.
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheValue> {
        self.entries.get(key)
    }

    // == Put ==
    /// Stores a value, replacing any previous one.
    pub fn put(&mut self, key: CacheKey, value: CacheValue) {
        self.entries.insert(key, value);
    }

    // == Delete ==
    /// Removes a key. Returns whether it was present.
    pub fn delete(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True if `key` holds a value equal to `value`.
    pub fn holds(&self, key: &CacheKey, value: &CacheValue) -> bool {
        self.entries.get(key).is_some_and(|cached| cached == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CacheKey {
        CacheKey::from_raw(s)
    }

    #[test]
    fn test_local_new() {
        let cache = LocalCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_put_and_get() {
        let mut cache = LocalCache::new();
        cache.put(key("k1"), CacheValue::from("v1"));
        assert_eq!(cache.get(&key("k1")), Some(&CacheValue::from("v1")));
        assert!(cache.get(&key("missing")).is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let mut cache = LocalCache::new();
        cache.put(key("k1"), CacheValue::from("v1"));
        cache.put(key("k1"), CacheValue::from("v2"));
        assert_eq!(cache.get(&key("k1")), Some(&CacheValue::from("v2")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete() {
        let mut cache = LocalCache::new();
        cache.put(key("k1"), CacheValue::from("v1"));
        assert!(cache.delete(&key("k1")));
        assert!(!cache.delete(&key("k1")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut cache = LocalCache::new();
        cache.put(key("a"), CacheValue::from(1u64));
        cache.put(key("b"), CacheValue::from(2u64));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_holds_compares_values() {
        let mut cache = LocalCache::new();
        cache.put(key("a"), CacheValue::from("x"));
        assert!(cache.holds(&key("a"), &CacheValue::from("x")));
        assert!(!cache.holds(&key("a"), &CacheValue::from("y")));
        assert!(!cache.holds(&key("b"), &CacheValue::from("x")));
    }
}
