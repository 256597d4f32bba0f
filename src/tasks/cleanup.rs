//! Stale Entry Cleanup Task
//!
//! Background task that periodically purges stale cache entries so they stop
//! occupying capacity.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::RequestCache;

/// Spawns a background task that periodically purges stale cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between runs. Reads never evict stale entries on their own; this task is
/// what reclaims their slots between overwrites.
///
/// # Arguments
/// * `cache` - Handle to the shared cache
/// * `cleanup_interval_secs` - Interval in seconds between purges
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = RequestCache::new(500, Duration::from_secs(300))?;
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(cache: RequestCache<V>, cleanup_interval_secs: u64) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting stale entry cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired();

            if removed > 0 {
                info!("Cache cleanup: removed {} stale entries", removed);
            } else {
                debug!("Cache cleanup: no stale entries found");
            }
        }
    })
}
