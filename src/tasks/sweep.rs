//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries, so that
//! entries no longer being read still get reclaimed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the configured interval
/// between sweeps. Each sweep acquires a write lock on the cache store and
/// removes every expired entry, counting each removal as an eviction.
///
/// # Arguments
/// * `store` - Shared reference to the cache store
/// * `interval` - Time between sweeps
///
/// # Returns
/// The handle of the spawned task; aborting it is how the manager stops
/// the sweep on shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(store.clone(), Duration::from_secs(60));
/// // On shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task<V>(
    store: Arc<RwLock<CacheStore<V>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting expiry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            // Hold the write lock only for the sweep itself
            let removed = {
                let mut store_guard = store.write().await;
                store_guard.cleanup_expired()
            };

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::cache::KeyCodec;

    fn test_store() -> Arc<RwLock<CacheStore<String>>> {
        Arc::new(RwLock::new(CacheStore::new(
            Box::new(MemoryBackend::new()),
            KeyCodec::new(""),
            100,
            Duration::from_secs(300),
            Box::new(|value: &String| value.len()),
        )))
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let store = test_store();

        // Add an entry that expires immediately
        {
            let mut store_guard = store.write().await;
            store_guard.set(
                "expire_soon".to_string(),
                "value".to_string(),
                Some(Duration::ZERO),
            );
        }

        // Spawn sweep task with a short interval
        let handle = spawn_sweep_task(store.clone(), Duration::from_millis(100));

        // Wait for the sweep to run
        tokio::time::sleep(Duration::from_millis(350)).await;

        // Verify entry was removed and counted as an eviction
        {
            let mut store_guard = store.write().await;
            assert!(store_guard.get("expire_soon").is_none());
            assert_eq!(store_guard.stats().evictions, 1);
        }

        // Abort the sweep task
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let store = test_store();

        // Add an entry with a long TTL
        {
            let mut store_guard = store.write().await;
            store_guard.set(
                "long_lived".to_string(),
                "value".to_string(),
                Some(Duration::from_secs(3600)),
            );
        }

        // Spawn sweep task
        let handle = spawn_sweep_task(store.clone(), Duration::from_millis(100));

        // Wait for the sweep to run
        tokio::time::sleep(Duration::from_millis(350)).await;

        // The unexpired entry must survive the sweep
        {
            let mut store_guard = store.write().await;
            assert_eq!(store_guard.get("long_lived").as_deref(), Some("value"));
        }

        // Abort the sweep task
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let store = test_store();

        let handle = spawn_sweep_task(store, Duration::from_millis(100));
        handle.abort();

        // Give the runtime a moment to settle the abort
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "aborted sweep task still running");
    }
}
