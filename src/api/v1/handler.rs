use super::error::*;
use crate::application_port::*;
use crate::domain_model::{Page, TodoId, TodoStatus, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{self, reject};

// region envelope

#[derive(Debug, Serialize)]
pub struct Meta {
    pub http_status: u16,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
    pub http_status: u16,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: Meta,
}

#[derive(Debug, Serialize)]
pub struct ApiListResponse<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct ApiMessageResponse {
    pub message: String,
    pub meta: Meta,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub errors: Vec<ApiError>,
    pub meta: Meta,
}

impl ApiErrorResponse {
    pub fn new(code: ApiErrorCode) -> Self {
        ApiErrorResponse {
            errors: vec![ApiError {
                code: code.code(),
                message: code.to_string(),
            }],
            meta: Meta {
                http_status: code.status().as_u16(),
            },
        }
    }
}

fn reply_data<T: Serialize>(data: T, status: StatusCode) -> WithStatus<Json> {
    let body = ApiResponse {
        data,
        meta: Meta {
            http_status: status.as_u16(),
        },
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn reply_list<T: Serialize>(data: Vec<T>, page: Page, total: u64) -> WithStatus<Json> {
    let body = ApiListResponse {
        data,
        meta: PageMeta {
            limit: page.limit,
            offset: page.offset,
            total,
            http_status: StatusCode::OK.as_u16(),
        },
    };
    warp::reply::with_status(warp::reply::json(&body), StatusCode::OK)
}

fn reply_message(message: &str) -> WithStatus<Json> {
    let body = ApiMessageResponse {
        message: message.to_string(),
        meta: Meta {
            http_status: StatusCode::OK.as_u16(),
        },
    };
    warp::reply::with_status(warp::reply::json(&body), StatusCode::OK)
}

fn rejected<E: Into<ApiErrorCode>>(error: E) -> warp::Rejection {
    reject::custom(error.into())
}

// endregion

/// Lenient paging: unparsable or non-positive values take the defaults.
fn page_from(limit: Option<&str>, offset: Option<&str>) -> Page {
    Page::new(
        limit.and_then(|l| l.parse().ok()),
        offset.and_then(|o| o.parse().ok()),
    )
}

fn user_id_of(claims: &SessionClaims) -> Result<UserId, warp::Rejection> {
    claims.user_id().map_err(rejected)
}

fn parse_status(status: &str) -> Result<TodoStatus, warp::Rejection> {
    status
        .parse::<TodoStatus>()
        .map_err(|_| rejected(ApiErrorCode::BadRequest))
}

fn parse_todo_id(id: &str) -> Result<TodoId, warp::Rejection> {
    id.parse::<u64>()
        .map(TodoId)
        .map_err(|_| rejected(ApiErrorCode::BadRequest))
}

// region auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .login(LoginInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(rejected)?;

    Ok(reply_data(tokens, StatusCode::OK))
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    body: RefreshTokenRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh(&body.refresh_token)
        .await
        .map_err(rejected)?;

    Ok(reply_data(tokens, StatusCode::OK))
}

pub async fn logout(
    claims: SessionClaims,
    body: RefreshTokenRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(LogoutInput {
            claims,
            refresh_token: body.refresh_token,
        })
        .await
        .map_err(rejected)?;

    Ok(reply_message("Logged out"))
}

// endregion

// region users

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

pub async fn register(
    body: RegisterRequest,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_service
        .register(RegisterInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(rejected)?;

    Ok(reply_data(user, StatusCode::CREATED))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    pub id: Option<String>,
    pub username: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub async fn search_users(
    query: UserSearchQuery,
    _claims: SessionClaims,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let page = page_from(query.limit.as_deref(), query.offset.as_deref());
    let user_id = query
        .id
        .as_deref()
        .and_then(|id| id.parse::<u64>().ok())
        .filter(|id| *id > 0)
        .map(UserId);
    let username = query.username.filter(|u| !u.is_empty());

    let (users, total) = user_service
        .list(SearchUserInput {
            user_id,
            username,
            page,
        })
        .await
        .map_err(rejected)?;

    Ok(reply_list(users, page, total))
}

pub async fn me(
    claims: SessionClaims,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = user_id_of(&claims)?;
    let user = user_service.find_by_id(user_id).await.map_err(rejected)?;

    Ok(reply_data(user, StatusCode::OK))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    claims: SessionClaims,
    body: ChangePasswordRequest,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = user_id_of(&claims)?;
    user_service
        .change_password(ChangePasswordInput {
            user_id,
            old_password: body.old_password,
            new_password: body.new_password,
        })
        .await
        .map_err(rejected)?;

    Ok(reply_message("User updated"))
}

// endregion

// region todos

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
}

pub async fn create_todo(
    claims: SessionClaims,
    body: CreateTodoRequest,
    todo_service: Arc<dyn TodoService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = user_id_of(&claims)?;
    let todo = todo_service
        .create(CreateTodoInput {
            user_id,
            title: body.title,
            description: body.description,
        })
        .await
        .map_err(rejected)?;

    Ok(reply_data(todo, StatusCode::CREATED))
}

#[derive(Debug, Default, Deserialize)]
pub struct TodoSearchQuery {
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub async fn search_todos(
    query: TodoSearchQuery,
    claims: SessionClaims,
    todo_service: Arc<dyn TodoService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = user_id_of(&claims)?;
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(parse_status(s)?),
    };
    let page = page_from(query.limit.as_deref(), query.offset.as_deref());

    let (todos, total) = todo_service
        .list(SearchTodoInput {
            user_id,
            status,
            page,
        })
        .await
        .map_err(rejected)?;

    Ok(reply_list(todos, page, total))
}

pub async fn get_todo(
    id: String,
    claims: SessionClaims,
    todo_service: Arc<dyn TodoService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = user_id_of(&claims)?;
    let todo_id = parse_todo_id(&id)?;
    let todo = todo_service
        .find_by_id(todo_id, user_id)
        .await
        .map_err(rejected)?;

    Ok(reply_data(todo, StatusCode::OK))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
}

pub async fn update_todo(
    id: String,
    claims: SessionClaims,
    body: UpdateTodoRequest,
    todo_service: Arc<dyn TodoService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = user_id_of(&claims)?;
    let todo_id = parse_todo_id(&id)?;
    let status = parse_status(&body.status)?;

    todo_service
        .update_by_id(UpdateTodoInput {
            todo_id,
            user_id,
            title: body.title,
            description: body.description,
            status,
        })
        .await
        .map_err(rejected)?;

    Ok(reply_message("Todo updated"))
}

// endregion
