use crate::domain_model::UserId;
use crate::domain_port::{RepoError, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const REFRESH_KEY_PREFIX: &str = "refresh-token";
pub const REVOKE_KEY_PREFIX: &str = "revoke-jwt-token";

pub const ACCESS_TTL: Duration = Duration::from_secs(15 * 60); // 15 minutes
pub const REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60); // 7 days

pub fn refresh_key(refresh_token: &str) -> String {
    format!("{REFRESH_KEY_PREFIX}:{refresh_token}")
}

pub fn revoke_key(jti: &str) -> String {
    format!("{REVOKE_KEY_PREFIX}:{jti}")
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid password")]
    InvalidPassword,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("invalid logout session")]
    InvalidLogoutSession,
    #[error("invalid user id")]
    InvalidUserId,
    #[error("token revoked")]
    TokenRevoked,
    #[error("missing or invalid auth header")]
    MissingOrInvalidAuthHeader,
    #[error("invalid auth token: {0}")]
    InvalidAuthToken(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<RepoError> for AuthError {
    fn from(err: RepoError) -> Self {
        AuthError::Store(err.to_string())
    }
}

/// Claims carried by an access token. `jti` keys the revocation record.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl SessionClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidUserId)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LogoutInput {
    pub claims: SessionClaims,
    pub refresh_token: String,
}

pub trait TokenCodec: Send + Sync {
    fn create(&self, subject: &str) -> Result<String, TokenError>;
    fn parse(&self, token: &str) -> Result<SessionClaims, TokenError>;
}

pub trait RefreshTokenGenerator: Send + Sync {
    fn create(&self) -> String;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<TokenPair, AuthError>;
    async fn logout(&self, request: LogoutInput) -> Result<(), AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
    async fn validate_request(&self, bearer_token: &str) -> Result<SessionClaims, AuthError>;
}
