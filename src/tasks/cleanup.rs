use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::database::DbStore;

pub async fn cleanup_expired_shares(store: &DbStore) -> anyhow::Result<u64> {
    tracing::info!("Starting cleanup of expired shares");

    let count = store.cleanup_expired().await?;

    tracing::info!("Cleanup completed: {} shares deactivated", count);
    Ok(count)
}

/// Handle to the periodic expiry sweep.
pub struct CleanupTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Stops the sweep and waits for an in-flight pass to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!("Cleanup task ended abnormally: {}", e);
        }
    }
}

pub fn start_cleanup_task(store: DbStore, period: Duration) -> CleanupTask {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Share cleanup task stopped");
                    break;
                }
                _ = interval.tick() => {}
            }

            match cleanup_expired_shares(&store).await {
                Ok(count) => {
                    tracing::info!("Share cleanup task completed: {} shares deactivated", count);
                }
                Err(e) => {
                    tracing::error!("Share cleanup task failed: {}", e);
                }
            }
        }
    });

    CleanupTask { cancel, handle }
}
