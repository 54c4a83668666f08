use crate::domain_model::{Page, UserId};
use crate::domain_port::{RepoError, UserRecord};
use crate::application_port::AuthError;
use chrono::SecondsFormat;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("username already exists")]
    UsernameTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid old password")]
    InvalidOldPassword,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<RepoError> for UserError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(_) => UserError::UsernameTaken,
            RepoError::Store(msg) => UserError::Store(msg),
        }
    }
}

impl From<AuthError> for UserError {
    fn from(err: AuthError) -> Self {
        UserError::InternalError(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ChangePasswordInput {
    pub user_id: UserId,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchUserInput {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for UserView {
    fn from(record: &UserRecord) -> Self {
        UserView {
            id: record.user_id,
            username: record.username.clone(),
            created_at: record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            updated_at: record.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<UserView, UserError>;
    async fn list(&self, request: SearchUserInput) -> Result<(Vec<UserView>, u64), UserError>;
    async fn find_by_id(&self, user_id: UserId) -> Result<UserView, UserError>;
    async fn change_password(&self, request: ChangePasswordInput) -> Result<(), UserError>;
}
