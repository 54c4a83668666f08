use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Backend(String),
}

/// Single-key operations against a key-value store with expiry.
/// Implementations must be safe to share across request handlers; no
/// client-side locking is expected from callers.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
    async fn del(&self, key: &str) -> Result<(), StoreError>;
    /// Atomically read and delete `key`. Of concurrent callers, at most one
    /// sees the value.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}
