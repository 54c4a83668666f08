use crate::api::v1::handler::ApiErrorResponse;
use crate::application_port::*;
use crate::logger::*;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        *code
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<reject::InvalidQuery>().is_some()
        || err.find::<reject::UnsupportedMediaType>().is_some()
        || err.find::<reject::PayloadTooLarge>().is_some()
        || err.find::<reject::LengthRequired>().is_some()
    {
        debug!(rejection = ?err, "bad request");
        ApiErrorCode::BadRequest
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::NotFound
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        ApiErrorCode::InternalError
    };

    let json = warp::reply::json(&ApiErrorResponse::new(code));
    Ok(warp::reply::with_status(json, code.status()))
}

/// Stable error codes exposed to clients.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum ApiErrorCode {
    #[error("Username already exist")]
    UsernameTaken,
    #[error("Username not found")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidCredentials,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Invalid logout session")]
    InvalidLogoutSession,
    #[error("Invalid user id")]
    InvalidUserId,
    #[error("Invalid old password")]
    InvalidOldPassword,
    #[error("token revoked")]
    TokenRevoked,
    #[error("missing or invalid auth header")]
    MissingOrInvalidAuthHeader,
    #[error("invalid auth token")]
    InvalidAuthToken,
    #[error("Bad request")]
    BadRequest,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Internal server error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn code(&self) -> u16 {
        match self {
            ApiErrorCode::UsernameTaken => 1000,
            ApiErrorCode::UserNotFound => 1002,
            ApiErrorCode::InvalidCredentials => 1003,
            ApiErrorCode::InvalidRefreshToken => 1004,
            ApiErrorCode::InvalidLogoutSession => 1005,
            ApiErrorCode::InvalidUserId => 1006,
            ApiErrorCode::InvalidOldPassword => 1007,
            ApiErrorCode::TokenRevoked => 1008,
            ApiErrorCode::MissingOrInvalidAuthHeader => 1009,
            ApiErrorCode::InvalidAuthToken => 1010,
            ApiErrorCode::BadRequest => 1400,
            ApiErrorCode::Forbidden => 1403,
            ApiErrorCode::NotFound => 1404,
            ApiErrorCode::InternalError => 1500,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::UsernameTaken
            | ApiErrorCode::InvalidOldPassword
            | ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::UserNotFound | ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidRefreshToken
            | ApiErrorCode::InvalidLogoutSession
            | ApiErrorCode::TokenRevoked
            | ApiErrorCode::MissingOrInvalidAuthHeader
            | ApiErrorCode::InvalidAuthToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InvalidUserId => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidPassword => ApiErrorCode::InvalidCredentials,
            AuthError::UserNotFound => ApiErrorCode::UserNotFound,
            AuthError::InvalidRefreshToken => ApiErrorCode::InvalidRefreshToken,
            AuthError::InvalidLogoutSession => ApiErrorCode::InvalidLogoutSession,
            AuthError::InvalidUserId => ApiErrorCode::InvalidUserId,
            AuthError::TokenRevoked => ApiErrorCode::TokenRevoked,
            AuthError::MissingOrInvalidAuthHeader => ApiErrorCode::MissingOrInvalidAuthHeader,
            AuthError::InvalidAuthToken(reason) => {
                debug!(%reason, "rejected auth token");
                ApiErrorCode::InvalidAuthToken
            }
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<UserError> for ApiErrorCode {
    fn from(error: UserError) -> Self {
        match error {
            UserError::UsernameTaken => ApiErrorCode::UsernameTaken,
            UserError::UserNotFound => ApiErrorCode::UserNotFound,
            UserError::InvalidOldPassword => ApiErrorCode::InvalidOldPassword,
            UserError::Store(e) => ApiErrorCode::internal(e),
            UserError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<TodoError> for ApiErrorCode {
    fn from(error: TodoError) -> Self {
        match error {
            TodoError::NotFound => ApiErrorCode::NotFound,
            TodoError::Forbidden => ApiErrorCode::Forbidden,
            TodoError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}
