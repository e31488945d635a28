use async_trait::async_trait;

use crate::models::analytics::{EventSummary, NewAccessEvent};
use crate::models::file::{NewSharedFile, SharedFile};
use crate::models::share::{NewShare, Share};
use crate::utils::error::AppResult;

/// Persistence for shares and everything they own. Files and access events
/// are keyed by the public `share_id`, and both cascade with their share.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Inserts a share and returns its row id. A duplicate `share_id` surfaces
    /// as a unique-violation database error.
    async fn create_share(&self, share: &NewShare) -> AppResult<i64>;

    async fn add_file(&self, file: &NewSharedFile) -> AppResult<i64>;

    /// Active shares only. Expiration is left to the caller.
    async fn get_share(&self, share_id: &str) -> AppResult<Option<Share>>;

    /// Files of a share in upload order.
    async fn get_files(&self, share_id: &str) -> AppResult<Vec<SharedFile>>;

    async fn track_event(&self, event: &NewAccessEvent) -> AppResult<i64>;

    async fn get_analytics(&self, share_id: &str) -> AppResult<Vec<EventSummary>>;

    /// Deactivates every active share whose expiration has passed and returns
    /// how many were switched off.
    async fn cleanup_expired(&self) -> AppResult<u64>;

    async fn close(&self);

    fn backend_name(&self) -> &'static str;
}
