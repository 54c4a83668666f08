use crate::domain_port::{SessionStore, StoreError};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Process-local [`SessionStore`] with lazy expiry.
///
/// Entries are dropped when a read finds them past their deadline. Nothing is
/// shared between processes, so only a single API instance may use it.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of a live key.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|e| e.1 > now)
            .map(|e| e.1 - now)
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .map(|e| (e.0.clone(), e.1 > now));
        match value {
            Some((v, true)) => Some(v),
            Some((_, false)) => {
                self.entries.remove_if(key, |_, e| e.1 <= now);
                None
            }
            None => None,
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.live_value(key))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Err(StoreError::Backend("ttl must be positive".to_string()));
        }
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .and_then(|(_, (value, deadline))| (deadline > now).then_some(value)))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live_value(key).is_some())
    }
}
