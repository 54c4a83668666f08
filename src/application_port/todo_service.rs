use crate::domain_model::{Page, TodoId, TodoStatus, UserId};
use crate::domain_port::{RepoError, TodoRecord};
use chrono::SecondsFormat;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error("todo not found")]
    NotFound,
    #[error("todo belongs to another user")]
    Forbidden,
    #[error("store error: {0}")]
    Store(String),
}

impl From<RepoError> for TodoError {
    fn from(err: RepoError) -> Self {
        TodoError::Store(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateTodoInput {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchTodoInput {
    pub user_id: UserId,
    pub status: Option<TodoStatus>,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct UpdateTodoInput {
    pub todo_id: TodoId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct TodoView {
    pub id: TodoId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&TodoRecord> for TodoView {
    fn from(record: &TodoRecord) -> Self {
        TodoView {
            id: record.todo_id,
            user_id: record.user_id,
            title: record.title.clone(),
            description: record.description.clone().unwrap_or_default(),
            status: record.status.to_string(),
            created_at: record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            updated_at: record.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[async_trait::async_trait]
pub trait TodoService: Send + Sync {
    async fn create(&self, request: CreateTodoInput) -> Result<TodoView, TodoError>;
    async fn list(&self, request: SearchTodoInput) -> Result<(Vec<TodoView>, u64), TodoError>;
    async fn find_by_id(&self, todo_id: TodoId, user_id: UserId) -> Result<TodoView, TodoError>;
    async fn update_by_id(&self, request: UpdateTodoInput) -> Result<(), TodoError>;
}
