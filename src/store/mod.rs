//! Persistent Store Module
//!
//! The shared, cross-request tier the object cache sits in front of.
//!
//! [`PersistentStore`] is the capability the cache consumes: individually
//! atomic get-with-token, add, compare-and-swap, delete and counter
//! operations. Concurrency safety of the shared tier belongs to the
//! implementation. [`MemoryStore`] is an in-process implementation with
//! memcached-like semantics.

mod entry;
mod lru;
mod memory;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

pub use crate::error::{StoreError, StoreResult};
pub use entry::StoredItem;
pub use lru::LruIndex;
pub use memory::MemoryStore;

/// Port used when a server address does not name one.
pub const DEFAULT_PORT: u16 = 11211;

// == CAS Token ==
/// Version token returned with a read, required for a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CasToken(pub u64);

// == Stored Value ==
/// A value read from the store together with its version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: Vec<u8>,
    pub token: CasToken,
}

// == Server Address ==
/// A `host:port` pair naming one store server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host`, `host:port`, `[ipv6]` or `[ipv6]:port`. A missing or
    /// zero port becomes [`DEFAULT_PORT`]. Unbracketed IPv6 is rejected.
    pub fn parse(s: &str) -> StoreResult<Self> {
        let s = s.trim();
        let invalid = || StoreError::InvalidAddress(s.to_string());

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            match tail {
                "" => (host, ""),
                _ => (host, tail.strip_prefix(':').ok_or_else(invalid)?),
            }
        } else {
            match s.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => return Err(invalid()),
                Some((host, port)) => (host, port),
                None => (s, ""),
            }
        };
        if host.is_empty() || host.contains(['[', ']']) {
            return Err(invalid());
        }
        let port = if port.is_empty() {
            0
        } else {
            port.parse::<u16>().map_err(|_| invalid())?
        };
        let port = if port == 0 { DEFAULT_PORT } else { port };
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// == Server Info ==
/// Entry of the server list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
    pub weight: u32,
}

// == Server Stats ==
/// Status metrics for one store server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerStats {
    /// Seconds since the server started
    pub uptime: i64,
    /// Items currently stored
    pub curr_items: u64,
    /// Items stored since start
    pub total_items: u64,
    /// Payload bytes currently stored
    pub bytes: u64,
    /// Item capacity before LRU eviction
    pub limit_items: u64,
    pub cmd_get: u64,
    pub cmd_set: u64,
    pub get_hits: u64,
    pub get_misses: u64,
    pub evictions: u64,
    pub version: String,
}

impl ServerStats {
    /// get_hits / cmd_get, or 0.0 before any read.
    pub fn hit_ratio(&self) -> f64 {
        if self.cmd_get == 0 {
            0.0
        } else {
            self.get_hits as f64 / self.cmd_get as f64
        }
    }
}

// == Persistent Store ==
/// Shared, long-lived cache tier.
///
/// Implementations must tolerate concurrent use from many object caches.
/// TTLs are in seconds; zero means "never expires".
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Registers a server. Registering the same address twice is a no-op.
    async fn add_server(&self, host: &str, port: u16) -> StoreResult<()>;

    /// Reads a value and its CAS token. `Ok(None)` if absent.
    async fn get_with_token(&self, key: &str) -> StoreResult<Option<StoredValue>>;

    /// Stores only if the key is absent. `Ok(false)` if it already exists.
    async fn add(&self, key: &str, value: &[u8], ttl: u64) -> StoreResult<bool>;

    /// Stores only if the key's token still equals `token`.
    /// `Ok(false)` if the token is stale or the key is gone.
    async fn cas(&self, token: CasToken, key: &str, value: &[u8], ttl: u64) -> StoreResult<bool>;

    /// Removes a key. `Ok(false)` if it was absent.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Adds `n` to a numeric value. `Ok(None)` if absent.
    async fn increment(&self, key: &str, n: u64) -> StoreResult<Option<u64>>;

    /// Subtracts `n` from a numeric value, flooring at zero. `Ok(None)` if absent.
    async fn decrement(&self, key: &str, n: u64) -> StoreResult<Option<u64>>;

    /// Per-server metrics keyed by `host:port`.
    async fn stats(&self) -> StoreResult<BTreeMap<String, ServerStats>>;

    /// Registered servers.
    async fn server_list(&self) -> StoreResult<Vec<ServerInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        assert_eq!(
            ServerAddr::parse("10.0.0.5:11311").unwrap(),
            ServerAddr::new("10.0.0.5", 11311)
        );
    }

    #[test]
    fn test_parse_defaults_port() {
        assert_eq!(ServerAddr::parse("cache1").unwrap().port, DEFAULT_PORT);
        assert_eq!(ServerAddr::parse("cache1:").unwrap().port, DEFAULT_PORT);
        assert_eq!(ServerAddr::parse(" cache1:0 ").unwrap().port, DEFAULT_PORT);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            ServerAddr::parse("cache1:http"),
            Err(StoreError::InvalidAddress(_))
        ));
        assert!(matches!(
            ServerAddr::parse(":11211"),
            Err(StoreError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_parse_bracketed_ipv6() {
        assert_eq!(
            ServerAddr::parse("[::1]:11311").unwrap(),
            ServerAddr::new("::1", 11311)
        );
        assert_eq!(ServerAddr::parse("[fe80::2]").unwrap().port, DEFAULT_PORT);
        assert_eq!(ServerAddr::new("::1", 11211).to_string(), "[::1]:11211");
    }

    #[test]
    fn test_parse_rejects_bare_ipv6() {
        for bad in ["::1", "fe80::2:11211", "[::1", "[::1]11211", "[]:11211"] {
            assert!(
                matches!(ServerAddr::parse(bad), Err(StoreError::InvalidAddress(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ServerAddr::new("localhost", 11211).to_string(), "localhost:11211");
    }

    #[test]
    fn test_hit_ratio() {
        let mut stats = ServerStats::default();
        assert_eq!(stats.hit_ratio(), 0.0);
        stats.cmd_get = 4;
        stats.get_hits = 3;
        assert_eq!(stats.hit_ratio(), 0.75);
    }
}
