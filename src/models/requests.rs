//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming path segments, query strings and bodies.

use serde::Deserialize;
use serde_json::Value;

/// Maximum length of a group or id path segment, in bytes
pub const MAX_SEGMENT_LENGTH: usize = 256;

/// Path parameters naming one cached item (`/cache/:group/:id`)
#[derive(Debug, Clone, Deserialize)]
pub struct ItemPath {
    pub group: String,
    pub id: String,
}

impl ItemPath {
    /// Validates the path segments
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        for (name, value) in [("Group", &self.group), ("Id", &self.id)] {
            if value.trim().is_empty() {
                return Some(format!("{} cannot be empty", name));
            }
            if value.len() > MAX_SEGMENT_LENGTH {
                return Some(format!(
                    "{} exceeds maximum length of {} bytes",
                    name, MAX_SEGMENT_LENGTH
                ));
            }
        }
        None
    }
}

/// Request body for the SET operation (PUT /cache/:group/:id)
///
/// # Fields
/// - `value`: Any JSON value to store
/// - `ttl`: TTL in seconds; 0 or absent uses the jittered default
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store
    pub value: Value,
    /// TTL in seconds
    #[serde(default)]
    pub ttl: u64,
}

/// `?debug=true` attaches the request's cache statistics to the response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebugParams {
    #[serde(default)]
    pub debug: bool,
}

/// Query string for incr/decr (`?by=N&debug=true`)
#[derive(Debug, Clone, Deserialize)]
pub struct CounterParams {
    #[serde(default = "default_step")]
    pub by: u64,
    #[serde(default)]
    pub debug: bool,
}

fn default_step() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(group: &str, id: &str) -> ItemPath {
        ItemPath {
            group: group.to_string(),
            id: id.to_string(),
        }
    }

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"value": {"title": "hello"}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.value["title"], "hello");
        assert_eq!(req.ttl, 0);
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"value": 5, "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, 60);
    }

    #[test]
    fn test_validate_empty_segments() {
        assert!(path("", "1").validate().is_some());
        assert!(path("posts", " ").validate().is_some());
    }

    #[test]
    fn test_validate_long_segment() {
        let long = "x".repeat(MAX_SEGMENT_LENGTH + 1);
        assert!(path("posts", &long).validate().is_some());
    }

    #[test]
    fn test_validate_valid_path() {
        assert!(path("posts", "42").validate().is_none());
    }

    #[test]
    fn test_counter_params_default_step() {
        let params: CounterParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.by, 1);
        assert!(!params.debug);
    }
}
