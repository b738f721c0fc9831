//! Tiered Cache - A request-scoped two-tier object cache
//!
//! Layers a per-request local cache over a shared persistent store with
//! tenant-isolated keys and compare-and-swap writes.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
