use crate::domain_model::*;
use crate::domain_port::RepoError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct TodoRecord {
    pub todo_id: TodoId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTodo {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
}

#[derive(Debug, Clone)]
pub struct TodoFilter {
    pub user_id: UserId,
    pub status: Option<TodoStatus>,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct TodoChanges {
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
}

#[async_trait::async_trait]
pub trait TodoRepo: Send + Sync {
    async fn create(&self, todo: NewTodo) -> Result<TodoRecord, RepoError>;

    /// Rows owned by `filter.user_id` for the page plus the unpaged total.
    async fn list(&self, filter: &TodoFilter) -> Result<(Vec<TodoRecord>, u64), RepoError>;

    async fn find_by_id(&self, todo_id: TodoId) -> Result<Option<TodoRecord>, RepoError>;

    async fn update_by_id(&self, todo_id: TodoId, changes: &TodoChanges) -> Result<(), RepoError>;
}
