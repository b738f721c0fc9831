//! LRU Index Module
//!
//! Recency ordering for the items of one store server.

use std::collections::{BTreeMap, HashMap};

// == LRU Index ==
/// Tracks item recency with a logical clock.
///
/// Every touch stamps the key with a fresh tick; the smallest tick is the
/// least recently used key. Touch, remove and eviction are all O(log n).
#[derive(Debug, Default)]
pub struct LruIndex {
    tick: u64,
    by_tick: BTreeMap<u64, String>,
    by_key: HashMap<String, u64>,
}

impl LruIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if new.
    pub fn touch(&mut self, key: &str) {
        self.tick += 1;
        if let Some(old) = self.by_key.insert(key.to_string(), self.tick) {
            self.by_tick.remove(&old);
        }
        self.by_tick.insert(self.tick, key.to_string());
    }

    // == Remove ==
    /// Stops tracking a key.
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.by_key.remove(key) {
            self.by_tick.remove(&tick);
        }
    }

    // == Evict ==
    /// Removes and returns the least recently used key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.by_tick.pop_first()?;
        self.by_key.remove(&key);
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
