//! Key Codec Module
//!
//! Derives stable, fixed-length cache keys from (namespace, scope, group, id).

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a derived key (128 bits).
const KEY_DIGEST_BYTES: usize = 16;

// == Scope Prefix ==
/// Isolation boundary a key is derived under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePrefix {
    /// Shared by every tenant
    Global,
    /// Owned by a resolved tenant
    Tenant(String),
    /// Tenant not yet known; the key only ever lives in the local cache
    Session,
}

impl fmt::Display for ScopePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopePrefix::Global => f.write_str("global"),
            ScopePrefix::Tenant(id) => write!(f, "tenant:{}", id),
            ScopePrefix::Session => f.write_str("session"),
        }
    }
}

// == Cache Key ==
/// Opaque hashed key shared by the local and persistent tiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps a key string as-is, without hashing it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Key String ==
/// Builds the pre-hash key string `namespace::scope::group::id` with all
/// whitespace removed.
pub fn key_string(scope: &ScopePrefix, group: &str, id: &str, namespace: &str) -> String {
    format!("{}::{}::{}::{}", namespace, scope, group, id)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

// == Derive Key ==
/// Derives the cache key for an item.
///
/// Case is preserved; only whitespace is stripped before hashing.
pub fn derive_key(scope: &ScopePrefix, group: &str, id: &str, namespace: &str) -> CacheKey {
    hash_key_string(&key_string(scope, group, id, namespace))
}

/// Hashes a prepared key string into a [`CacheKey`].
pub fn hash_key_string(keystring: &str) -> CacheKey {
    let digest = Sha256::digest(keystring.as_bytes());
    CacheKey(hex::encode(&digest[..KEY_DIGEST_BYTES]))
}
