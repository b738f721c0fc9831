//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;

use tracing::warn;

use crate::cache::{CacheSettings, DEFAULT_BASE_TTL};
use crate::store::{ServerAddr, DEFAULT_PORT};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// False runs every request in session-only mode
    pub cache_enabled: bool,
    /// Base TTL in seconds; the effective default is jittered up to 1.5x
    pub base_ttl: u64,
    /// Persistent store servers
    pub servers: Vec<ServerAddr>,
    /// Namespace mixed into every cache key
    pub namespace: String,
    /// Groups added to the global list for every request
    pub global_groups: Vec<String>,
    /// Groups added to the non-persistent list for every request
    pub non_persistent_groups: Vec<String>,
    /// Item capacity of each store server
    pub max_entries: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `OBJECT_CACHE_ENABLED` - Use the persistent tier (default: true)
    /// - `OBJECT_CACHE_EXPIRE` - Base TTL in seconds (default: 3600)
    /// - `CACHE_SERVERS` - Comma-separated `host[:port]` list (default: 127.0.0.1:11211)
    /// - `CACHE_NAMESPACE` - Key namespace (default: "default")
    /// - `CACHE_GLOBAL_GROUPS` - Comma-separated extra global groups
    /// - `CACHE_NON_PERSISTENT_GROUPS` - Comma-separated extra non-persistent groups
    /// - `MAX_ENTRIES` - Items per store server (default: 10000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_enabled: env::var("OBJECT_CACHE_ENABLED")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.cache_enabled),
            base_ttl: parse_var("OBJECT_CACHE_EXPIRE").unwrap_or(defaults.base_ttl),
            servers: env::var("CACHE_SERVERS")
                .ok()
                .map(|v| parse_servers(&v))
                .filter(|servers| !servers.is_empty())
                .unwrap_or(defaults.servers),
            namespace: env::var("CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.namespace),
            global_groups: env::var("CACHE_GLOBAL_GROUPS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            non_persistent_groups: env::var("CACHE_NON_PERSISTENT_GROUPS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// The slice of the configuration each request's cache is built from.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.cache_enabled,
            base_ttl: self.base_ttl,
            servers: self.servers.clone(),
            global_groups: self.global_groups.clone(),
            non_persistent_groups: self.non_persistent_groups.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            base_ttl: DEFAULT_BASE_TTL,
            servers: vec![ServerAddr::new("127.0.0.1", DEFAULT_PORT)],
            namespace: "default".to_string(),
            global_groups: Vec::new(),
            non_persistent_groups: Vec::new(),
            max_entries: 10_000,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parses a server list, skipping entries that are not valid addresses.
fn parse_servers(v: &str) -> Vec<ServerAddr> {
    split_list(v)
        .iter()
        .filter_map(|s| match ServerAddr::parse(s) {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!("Ignoring cache server entry: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.cache_enabled);
        assert_eq!(config.base_ttl, 3600);
        assert_eq!(config.servers, vec![ServerAddr::new("127.0.0.1", 11211)]);
        assert_eq!(config.namespace, "default");
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 1);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "OBJECT_CACHE_ENABLED",
            "OBJECT_CACHE_EXPIRE",
            "CACHE_SERVERS",
            "CACHE_NAMESPACE",
            "CACHE_GLOBAL_GROUPS",
            "CACHE_NON_PERSISTENT_GROUPS",
            "MAX_ENTRIES",
            "SERVER_PORT",
            "CLEANUP_INTERVAL",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert!(config.cache_enabled);
        assert_eq!(config.base_ttl, 3600);
        assert_eq!(config.servers.len(), 1);
        assert!(config.global_groups.is_empty());
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_parse_servers() {
        let servers = parse_servers("cache1:11311, cache2 ,:bad,");
        assert_eq!(
            servers,
            vec![
                ServerAddr::new("cache1", 11311),
                ServerAddr::new("cache2", 11211)
            ]
        );
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cache_settings() {
        let config = Config {
            cache_enabled: false,
            global_groups: vec!["themes".into()],
            ..Config::default()
        };
        let settings = config.cache_settings();
        assert!(!settings.enabled);
        assert_eq!(settings.global_groups, vec!["themes"]);
        assert_eq!(settings.base_ttl, 3600);
    }
}
