//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::StatsSnapshot;

/// Response body for the GET operation (GET /cache/:group/:id)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub group: String,
    pub id: String,
    /// The stored value
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
}

/// Response body for the SET operation (PUT /cache/:group/:id)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    pub group: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
}

impl SetResponse {
    pub fn new(group: impl Into<String>, id: impl Into<String>) -> Self {
        let (group, id) = (group.into(), id.into());
        Self {
            message: format!("Item '{}/{}' set successfully", group, id),
            group,
            id,
            stats: None,
        }
    }
}

/// Response body for the DELETE operation (DELETE /cache/:group/:id)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub group: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
}

impl DeleteResponse {
    pub fn new(group: impl Into<String>, id: impl Into<String>) -> Self {
        let (group, id) = (group.into(), id.into());
        Self {
            message: format!("Item '{}/{}' deleted successfully", group, id),
            group,
            id,
            stats: None,
        }
    }
}

/// Response body for incr/decr (POST /cache/:group/:id/incr|decr)
#[derive(Debug, Clone, Serialize)]
pub struct CounterResponse {
    pub group: String,
    pub id: String,
    /// Counter value after the operation
    pub value: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Read hit rate of this request's cache
    pub hit_rate: f64,
    #[serde(flatten)]
    pub snapshot: StatsSnapshot,
}

impl StatsResponse {
    pub fn new(snapshot: StatsSnapshot) -> Self {
        Self {
            hit_rate: snapshot.counts.hit_rate(),
            snapshot,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
