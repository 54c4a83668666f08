use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub page: Page,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a row and return it with the generated id and timestamps.
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, RepoError>;

    /// Matching rows for the page plus the total count ignoring the page.
    async fn list(&self, filter: &UserFilter) -> Result<(Vec<UserRecord>, u64), RepoError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn update_password(&self, user_id: UserId, password_hash: &str)
    -> Result<(), RepoError>;

    async fn count_by_username(&self, username: &str) -> Result<u64, RepoError>;
}
