//! Stored Item Module
//!
//! A value held by a store server, with its CAS version and optional expiry.

use chrono::Utc;

// == Stored Item ==
/// One item on a store server.
#[derive(Debug, Clone)]
pub struct StoredItem {
    /// Serialized payload
    pub value: Vec<u8>,
    /// Version token; changes on every write
    pub cas: u64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl StoredItem {
    // == Constructor ==
    /// Creates an item. A TTL of zero means the item never expires.
    pub fn new(value: Vec<u8>, cas: u64, ttl_seconds: u64) -> Self {
        let now = current_timestamp_ms();
        let ttl_ms = i64::try_from(ttl_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let expires_at = (ttl_seconds > 0).then(|| now.saturating_add(ttl_ms));

        Self {
            value,
            cas,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// An item is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|expires| now_ms >= expires)
    }

    // == Replace ==
    /// Swaps in a new payload and version, keeping the original expiry.
    ///
    /// Used by increment/decrement, which do not touch an item's TTL.
    pub fn replace_value(&mut self, value: Vec<u8>, cas: u64) {
        self.value = value;
        self.cas = cas;
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_item_without_ttl_never_expires() {
        let item = StoredItem::new(b"v".to_vec(), 1, 0);
        assert!(item.expires_at.is_none());
        assert!(!item.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_item_with_ttl() {
        let item = StoredItem::new(b"v".to_vec(), 1, 60);
        let expires = item.expires_at.unwrap();
        assert_eq!(expires - item.created_at, 60_000);
        assert!(!item.is_expired());
    }

    #[test]
    fn test_item_expiration() {
        let item = StoredItem::new(b"v".to_vec(), 1, 1);
        assert!(!item.is_expired());
        sleep(Duration::from_millis(1100));
        assert!(item.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let item = StoredItem {
            value: Vec::new(),
            cas: 1,
            created_at: now,
            expires_at: Some(now),
        };
        assert!(item.is_expired_at(now), "Item should be expired at boundary");
        assert!(!item.is_expired_at(now - 1));
    }

    #[test]
    fn test_replace_value_keeps_expiry() {
        let mut item = StoredItem::new(b"1".to_vec(), 1, 60);
        let expires = item.expires_at;
        item.replace_value(b"2".to_vec(), 9);
        assert_eq!(item.value, b"2".to_vec());
        assert_eq!(item.cas, 9);
        assert_eq!(item.expires_at, expires);
    }
}
