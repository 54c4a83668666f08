//! In-crate fakes shared by unit tests.

use crate::application_port::{AuthError, CredentialHasher};
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::MemorySessionStore;
use chrono::{TimeZone, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// "Hashes" by prefixing, so tests can seed records without running a KDF.
pub struct FakeHasher;

impl FakeHasher {
    pub fn hash(password: &str) -> String {
        format!("hashed:{password}")
    }
}

#[async_trait::async_trait]
impl CredentialHasher for FakeHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(Self::hash(password))
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        Ok(Self::hash(password) == password_hash)
    }
}

pub fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

#[derive(Default)]
pub struct FakeUserRepo {
    users: Mutex<Vec<UserRecord>>,
}

impl FakeUserRepo {
    pub fn with_user(username: &str, password: &str) -> Self {
        let repo = FakeUserRepo::default();
        repo.insert(username, &FakeHasher::hash(password));
        repo
    }

    pub fn insert(&self, username: &str, password_hash: &str) -> UserRecord {
        let mut users = self.users.lock().unwrap();
        let record = UserRecord {
            user_id: UserId(users.len() as u64 + 1),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: fixed_time(),
            updated_at: fixed_time(),
        };
        users.push(record.clone());
        record
    }

    pub fn password_hash(&self, user_id: UserId) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| u.password_hash.clone())
    }
}

#[async_trait::async_trait]
impl UserRepo for FakeUserRepo {
    async fn create_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, RepoError> {
        Ok(self.insert(username, password_hash))
    }

    async fn list(&self, filter: &UserFilter) -> Result<(Vec<UserRecord>, u64), RepoError> {
        let users = self.users.lock().unwrap();
        let matching: Vec<UserRecord> = users
            .iter()
            .filter(|u| filter.user_id.is_none_or(|id| u.user_id == id))
            .filter(|u| filter.username.as_deref().is_none_or(|n| u.username == n))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.page.offset as usize)
            .take(filter.page.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepoError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.user_id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn count_by_username(&self, username: &str) -> Result<u64, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.username == username)
            .count() as u64)
    }
}

#[derive(Default)]
pub struct FakeTodoRepo {
    todos: Mutex<Vec<TodoRecord>>,
    pub fail: bool,
}

impl FakeTodoRepo {
    pub fn failing() -> Self {
        FakeTodoRepo {
            fail: true,
            ..Default::default()
        }
    }

    pub fn all(&self) -> Vec<TodoRecord> {
        self.todos.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TodoRepo for FakeTodoRepo {
    async fn create(&self, todo: NewTodo) -> Result<TodoRecord, RepoError> {
        if self.fail {
            return Err(RepoError::Store("connection refused".to_string()));
        }
        let mut todos = self.todos.lock().unwrap();
        let record = TodoRecord {
            todo_id: TodoId(todos.len() as u64 + 1),
            user_id: todo.user_id,
            title: todo.title,
            description: todo.description,
            status: todo.status,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        };
        todos.push(record.clone());
        Ok(record)
    }

    async fn list(&self, filter: &TodoFilter) -> Result<(Vec<TodoRecord>, u64), RepoError> {
        let todos = self.todos.lock().unwrap();
        let matching: Vec<TodoRecord> = todos
            .iter()
            .filter(|t| t.user_id == filter.user_id)
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.page.offset as usize)
            .take(filter.page.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_id(&self, todo_id: TodoId) -> Result<Option<TodoRecord>, RepoError> {
        Ok(self
            .todos
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.todo_id == todo_id)
            .cloned())
    }

    async fn update_by_id(&self, todo_id: TodoId, changes: &TodoChanges) -> Result<(), RepoError> {
        let mut todos = self.todos.lock().unwrap();
        if let Some(todo) = todos.iter_mut().find(|t| t.todo_id == todo_id) {
            todo.title = changes.title.clone();
            todo.description = Some(changes.description.clone());
            todo.status = changes.status;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTxManager {
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
}

struct FakeTx<'t> {
    manager: &'t FakeTxManager,
}

#[async_trait::async_trait]
impl TxManager for FakeTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        Ok(Box::new(FakeTx { manager: self }))
    }
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for FakeTx<'t> {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.manager.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        self.manager.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(String, Vec<u8>, Vec<u8>)>>,
    pub fail: bool,
}

#[async_trait::async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, key: &[u8], payload: &[u8]) -> anyhow::Result<()> {
        if self.fail {
            return Err(anyhow::anyhow!("broker unavailable"));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), key.to_vec(), payload.to_vec()));
        Ok(())
    }
}

/// Every operation fails, as if the store were unreachable.
pub struct UnreachableSessionStore;

#[async_trait::async_trait]
impl SessionStore for UnreachableSessionStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn del(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn take(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }
}

/// In-memory store whose `del` and/or `take` can be made to fail.
#[derive(Default)]
pub struct FlakySessionStore {
    pub inner: MemorySessionStore,
    pub fail_del: bool,
    pub fail_take: bool,
}

#[async_trait::async_trait]
impl SessionStore for FlakySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.inner.set_ex(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_del {
            return Err(StoreError::Backend("del timed out".to_string()));
        }
        self.inner.del(key).await
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_take {
            return Err(StoreError::Backend("getdel timed out".to_string()));
        }
        self.inner.take(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.exists(key).await
    }
}
