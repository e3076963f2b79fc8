//! Background cleanup task for expired records.
//!
//! Runs periodically to delete records that have exceeded their TTL and to
//! evict idle rate limiter entries. Reads check age themselves, so this only
//! bounds memory; it is not needed for correctness.

use crate::config::CleanupConfig;
use crate::server::CodeRelay;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn a background cleanup task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task(
    relay: Arc<CodeRelay>,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!("Cleanup task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;

            match relay.sweep().await {
                Ok(deleted) => {
                    if deleted > 0 {
                        tracing::info!("Cleanup: deleted {} expired records", deleted);
                    } else {
                        tracing::debug!("Cleanup: no expired records");
                    }
                }
                Err(e) => {
                    tracing::error!("Cleanup error: {}", e);
                }
            }
        }
    })
}
