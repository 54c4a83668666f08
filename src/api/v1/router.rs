use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::server::*;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let healthz = warp::get()
        .and(warp::path!("healthz"))
        .map(|| "OK");

    // region public

    let login = warp::post()
        .and(warp::path!("api" / "login"))
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh_token = warp::post()
        .and(warp::path!("api" / "refresh-token"))
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh_token);

    let register = warp::post()
        .and(warp::path!("api" / "users"))
        .and(json_body())
        .and(with(server.user_service.clone()))
        .and_then(handler::register);

    // endregion

    // region authorized

    let logout = warp::post()
        .and(warp::path!("api" / "logout"))
        .and(with_claims(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let search_users = warp::get()
        .and(warp::path!("api" / "users"))
        .and(warp::query::<handler::UserSearchQuery>())
        .and(with_claims(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::search_users);

    let me = warp::get()
        .and(warp::path!("api" / "users" / "me"))
        .and(with_claims(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::me);

    let change_password = warp::patch()
        .and(warp::path!("api" / "users" / "me"))
        .and(with_claims(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.user_service.clone()))
        .and_then(handler::change_password);

    let create_todo = warp::post()
        .and(warp::path!("api" / "todos"))
        .and(with_claims(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.todo_service.clone()))
        .and_then(handler::create_todo);

    let search_todos = warp::get()
        .and(warp::path!("api" / "todos"))
        .and(warp::query::<handler::TodoSearchQuery>())
        .and(with_claims(server.auth_service.clone()))
        .and(with(server.todo_service.clone()))
        .and_then(handler::search_todos);

    let get_todo = warp::get()
        .and(warp::path!("api" / "todos" / String))
        .and(with_claims(server.auth_service.clone()))
        .and(with(server.todo_service.clone()))
        .and_then(handler::get_todo);

    let update_todo = warp::patch()
        .and(warp::path!("api" / "todos" / String))
        .and(with_claims(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.todo_service.clone()))
        .and_then(handler::update_todo);

    // endregion

    healthz
        .or(login)
        .or(refresh_token)
        .or(register)
        .or(logout)
        .or(search_users)
        .or(me)
        .or(change_password)
        .or(create_todo)
        .or(search_todos)
        .or(get_todo)
        .or(update_todo)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn json_body<T: DeserializeOwned + Send>()
-> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Bearer-token gate. Extracts the validated claims for the handler.
fn with_claims(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (SessionClaims,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str()).and_then(
        move |header: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let Some(token) = header.as_deref().and_then(|h| h.strip_prefix("Bearer "))
                else {
                    return Err(reject::custom(ApiErrorCode::MissingOrInvalidAuthHeader));
                };
                auth_service
                    .validate_request(token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::*;
    use crate::infra_memory::MemorySessionStore;
    use crate::testing::*;
    use serde_json::{Value, json};
    use warp::test::RequestBuilder;

    fn server() -> Arc<Server> {
        let users = Arc::new(FakeUserRepo::default());
        let auth_service = Arc::new(RealAuthService::new(
            users.clone(),
            Arc::new(FakeHasher),
            Arc::new(JwtHs256Codec::new(JwtConfig {
                issuer: "todo-backend".to_string(),
                access_ttl: ACCESS_TTL,
                signing_key: b"test-secret".to_vec(),
            })),
            Arc::new(UuidRefreshTokenGenerator::new()),
            Arc::new(MemorySessionStore::new()),
        ));
        let user_service = Arc::new(RealUserService::new(
            users,
            Arc::new(FakeHasher),
            Arc::new(RecordingPublisher::default()),
            Arc::new(FakeTxManager::default()),
            "user-registered",
        ));
        let todo_service = Arc::new(RealTodoService::new(Arc::new(FakeTodoRepo::default())));
        Arc::new(Server::new(auth_service, user_service, todo_service))
    }

    async fn send(server: &Arc<Server>, req: RequestBuilder) -> (u16, Value) {
        let api = routes(server.clone()).recover(recover_error);
        let res = req.reply(&api).await;
        let body = serde_json::from_slice(res.body()).unwrap_or(Value::Null);
        (res.status().as_u16(), body)
    }

    fn post(path: &str, body: Value) -> RequestBuilder {
        warp::test::request().method("POST").path(path).json(&body)
    }

    fn authed(req: RequestBuilder, token: &str) -> RequestBuilder {
        req.header("authorization", format!("Bearer {token}"))
    }

    /// Register `username` and log in, returning (access, refresh).
    async fn sign_in(server: &Arc<Server>, username: &str) -> (String, String) {
        let creds = json!({"username": username, "password": "password"});
        let (status, _) = send(server, post("/api/users", creds.clone())).await;
        assert_eq!(status, 201);
        let (status, body) = send(server, post("/api/login", creds)).await;
        assert_eq!(status, 200);
        (
            body["data"]["access_token"].as_str().unwrap().to_string(),
            body["data"]["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn healthz_is_public() {
        let res = warp::test::request()
            .path("/healthz")
            .reply(&routes(server()))
            .await;

        assert_eq!(res.status(), 200);
        assert_eq!(res.body().as_ref(), b"OK");
    }

    #[tokio::test]
    async fn register_then_duplicate_is_rejected_with_code() {
        let server = server();
        let creds = json!({"username": "johndoe", "password": "password"});

        let (status, body) = send(&server, post("/api/users", creds.clone())).await;
        assert_eq!(status, 201);
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["meta"]["http_status"], 201);

        let (status, body) = send(&server, post("/api/users", creds)).await;
        assert_eq!(status, 400);
        assert_eq!(
            body,
            json!({
                "errors": [{"code": 1000, "message": "Username already exist"}],
                "meta": {"http_status": 400}
            })
        );
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let server = server();
        sign_in(&server, "johndoe").await;

        let (status, body) = send(
            &server,
            post("/api/login", json!({"username": "johndoe", "password": "nope"})),
        )
        .await;

        assert_eq!(status, 401);
        assert_eq!(body["errors"][0]["code"], 1003);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let server = server();
        let req = warp::test::request()
            .method("POST")
            .path("/api/login")
            .header("content-type", "application/json")
            .body("{not json");

        let (status, body) = send(&server, req).await;

        assert_eq!(status, 400);
        assert_eq!(body["errors"][0]["code"], 1400);
    }

    #[tokio::test]
    async fn missing_or_non_bearer_header_is_rejected() {
        let server = server();

        let (status, body) = send(&server, warp::test::request().path("/api/users/me")).await;
        assert_eq!(status, 401);
        assert_eq!(body["errors"][0]["message"], "missing or invalid auth header");

        let req = warp::test::request()
            .path("/api/users/me")
            .header("authorization", "Token abc");
        let (_, body) = send(&server, req).await;
        assert_eq!(body["errors"][0]["code"], 1009);

        let req = authed(warp::test::request().path("/api/users/me"), "garbage");
        let (status, body) = send(&server, req).await;
        assert_eq!(status, 401);
        assert_eq!(body["errors"][0]["code"], 1010);
    }

    #[tokio::test]
    async fn me_returns_current_user() {
        let server = server();
        let (access, _) = sign_in(&server, "johndoe").await;

        let (status, body) =
            send(&server, authed(warp::test::request().path("/api/users/me"), &access)).await;

        assert_eq!(status, 200);
        assert_eq!(body["data"]["username"], "johndoe");
        assert!(body["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn logout_revokes_the_access_token() {
        let server = server();
        let (access, refresh) = sign_in(&server, "johndoe").await;

        let (status, body) = send(
            &server,
            authed(post("/api/logout", json!({"refresh_token": refresh})), &access),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Logged out");

        let (status, body) =
            send(&server, authed(warp::test::request().path("/api/users/me"), &access)).await;
        assert_eq!(status, 401);
        assert_eq!(body["errors"][0]["code"], 1008);
        assert_eq!(body["errors"][0]["message"], "token revoked");
    }

    #[tokio::test]
    async fn refresh_token_is_single_use() {
        let server = server();
        let (_, refresh) = sign_in(&server, "johndoe").await;

        let (status, body) = send(
            &server,
            post("/api/refresh-token", json!({"refresh_token": refresh})),
        )
        .await;
        assert_eq!(status, 200);
        assert_ne!(body["data"]["refresh_token"], json!(refresh));

        let (status, body) = send(
            &server,
            post("/api/refresh-token", json!({"refresh_token": refresh})),
        )
        .await;
        assert_eq!(status, 401);
        assert_eq!(body["errors"][0]["code"], 1004);
    }

    #[tokio::test]
    async fn todos_are_scoped_to_their_owner() {
        let server = server();
        let (alice, _) = sign_in(&server, "alice123").await;
        let (bob, _) = sign_in(&server, "bob12345").await;

        let (status, body) = send(
            &server,
            authed(post("/api/todos", json!({"title": "buy milk"})), &alice),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(body["data"]["status"], "pending");
        let id = body["data"]["id"].as_u64().unwrap();

        let path = format!("/api/todos/{id}");
        let (status, _) = send(&server, authed(warp::test::request().path(&path), &alice)).await;
        assert_eq!(status, 200);

        let (status, body) = send(&server, authed(warp::test::request().path(&path), &bob)).await;
        assert_eq!(status, 403);
        assert_eq!(body["errors"][0]["code"], 1403);

        let (status, body) =
            send(&server, authed(warp::test::request().path("/api/todos"), &bob)).await;
        assert_eq!(status, 200);
        assert_eq!(body["meta"]["total"], 0);
    }

    #[tokio::test]
    async fn update_todo_then_filter_by_status() {
        let server = server();
        let (access, _) = sign_in(&server, "johndoe").await;
        send(
            &server,
            authed(post("/api/todos", json!({"title": "a"})), &access),
        )
        .await;
        send(
            &server,
            authed(post("/api/todos", json!({"title": "b"})), &access),
        )
        .await;

        let req = warp::test::request()
            .method("PATCH")
            .path("/api/todos/2")
            .json(&json!({"title": "b", "description": "done", "status": "completed"}));
        let (status, body) = send(&server, authed(req, &access)).await;
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Todo updated");

        let req = warp::test::request().path("/api/todos?status=completed&limit=5");
        let (status, body) = send(&server, authed(req, &access)).await;
        assert_eq!(status, 200);
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["meta"]["limit"], 5);
        assert_eq!(body["data"][0]["description"], "done");

        let req = warp::test::request().path("/api/todos?status=someday");
        let (status, _) = send(&server, authed(req, &access)).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn unknown_todo_and_bad_id() {
        let server = server();
        let (access, _) = sign_in(&server, "johndoe").await;

        let (status, body) = send(
            &server,
            authed(warp::test::request().path("/api/todos/99"), &access),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body["errors"][0]["code"], 1404);

        let (status, _) = send(
            &server,
            authed(warp::test::request().path("/api/todos/abc"), &access),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn change_password_checks_old_password() {
        let server = server();
        let (access, _) = sign_in(&server, "johndoe").await;

        let req = warp::test::request()
            .method("PATCH")
            .path("/api/users/me")
            .json(&json!({"old_password": "wrong", "new_password": "secret"}));
        let (status, body) = send(&server, authed(req, &access)).await;
        assert_eq!(status, 400);
        assert_eq!(body["errors"][0]["code"], 1007);

        let req = warp::test::request()
            .method("PATCH")
            .path("/api/users/me")
            .json(&json!({"old_password": "password", "new_password": "secret"}));
        let (status, body) = send(&server, authed(req, &access)).await;
        assert_eq!(status, 200);
        assert_eq!(body["message"], "User updated");
    }

    #[tokio::test]
    async fn search_users_pages_results() {
        let server = server();
        let (access, _) = sign_in(&server, "johndoe").await;
        sign_in(&server, "janedoe1").await;

        let req = warp::test::request().path("/api/users?limit=1&offset=1");
        let (status, body) = send(&server, authed(req, &access)).await;

        assert_eq!(status, 200);
        assert_eq!(body["meta"]["total"], 2);
        assert_eq!(body["data"][0]["username"], "janedoe1");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = server();

        let (status, body) = send(&server, warp::test::request().path("/api/nope")).await;

        assert_eq!(status, 404);
        assert_eq!(body["errors"][0]["code"], 1404);
    }
}
