//! Expiry Sweep Task
//!
//! Background task that periodically removes expired store items.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a background task that periodically sweeps expired items out of
/// the shared store.
///
/// Expired items are already invisible to readers; the sweep only reclaims
/// their memory.
///
/// # Arguments
/// * `store` - The shared in-memory store
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_cleanup_task(store: Arc<MemoryStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.purge_expired().await;
            if removed > 0 {
                info!("Expiry sweep: removed {} expired items", removed);
            } else {
                debug!("Expiry sweep: no expired items found");
            }
        }
    })
}
