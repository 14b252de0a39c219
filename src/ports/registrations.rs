use crate::types::{ChannelId, CommunityId, CompletionRecord, Registration, UserId};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Persistent registration table plus the append-only completion history.
#[async_trait]
pub trait RegistrationStore: Send + Sync + 'static {
    async fn find(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> Result<Option<Registration>, StoreError>;

    /// Inserts or reactivates a registration. A missing name or channel keeps
    /// the stored value.
    async fn upsert(
        &self,
        community: CommunityId,
        user: UserId,
        display_name: Option<&str>,
        channel: Option<ChannelId>,
    ) -> Result<Registration, StoreError>;

    async fn list(&self) -> Result<Vec<Registration>, StoreError>;

    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), StoreError>;

    async fn completion_count(&self) -> Result<i64, StoreError>;
}
