//! Cache Module
//!
//! Request-scoped two-tier object cache: key derivation, group
//! classification, statistics, the local tier and the orchestrator.

mod groups;
mod key;
mod local;
mod object_cache;
mod stats;
mod tenant;
mod value;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use groups::{GroupClass, GroupClassifier, DEFAULT_GLOBAL_GROUPS, DEFAULT_NON_PERSISTENT_GROUPS};
pub use key::{derive_key, CacheKey, ScopePrefix};
pub use local::LocalCache;
pub use object_cache::{CacheSettings, ObjectCache, DEFAULT_BASE_TTL};
pub use stats::{CacheCounts, Counter, StatsRecorder, StatsSnapshot};
pub use tenant::{StaticTenant, TenantContext};
pub use value::CacheValue;
