//! Cache Value Module
//!
//! Opaque payload stored in both tiers, compared by canonical serialization.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Value ==
/// A cached value.
///
/// Equality is canonical-byte equality: two values are equal when they
/// serialize to the same compact JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheValue(Value);

impl CacheValue {
    // == Constructors ==
    /// Serializes any value into a `CacheValue`.
    pub fn new<T: Serialize>(data: &T) -> Result<Self> {
        serde_json::to_value(data)
            .map(Self)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Decodes a payload read back from the persistent tier.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map(Self)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    // == Accessors ==
    /// Canonical byte form; object keys are emitted in sorted order.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a `Value` cannot fail: keys are always strings.
        serde_json::to_vec(&self.0).unwrap_or_default()
    }

    /// Deserializes the payload into a concrete type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.0).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }
}

impl PartialEq for CacheValue {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for CacheValue {}

impl From<Value> for CacheValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<u64> for CacheValue {
    fn from(n: u64) -> Self {
        Self(Value::from(n))
    }
}

impl From<&str> for CacheValue {
    fn from(s: &str) -> Self {
        Self(Value::from(s))
    }
}

impl From<String> for CacheValue {
    fn from(s: String) -> Self {
        Self(Value::from(s))
    }
}
