#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use taskdeck_api::auth::jwt::JwtConfig;
use taskdeck_api::config::ServerConfig;
use taskdeck_api::router::build_app_router;
use taskdeck_api::state::AppState;
use taskdeck_events::EventBus;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_max_connections: 5,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Build the full application router on top of `pool`, with the same
/// middleware stack as production.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_bus(pool, Arc::new(EventBus::default()))
}

/// Like [`build_test_app`], sharing `bus` so a test can observe published
/// change events.
pub fn build_test_app_with_bus(pool: PgPool, bus: Arc<EventBus>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: bus,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the `data` envelope contents.
pub async fn expect_data(response: Response, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    let mut json = body_json(response).await;
    json["data"].take()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A registered user with a valid access token.
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub token: String,
}

pub async fn register(app: &Router, email: &str) -> TestUser {
    let body = serde_json::json!({
        "email": email,
        "name": email.split('@').next().unwrap(),
        "password": "correct-horse-battery",
    });
    let response = post_json(app.clone(), "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    TestUser {
        id: json["user"]["id"].as_i64().unwrap(),
        email: email.to_string(),
        token: json["accessToken"].as_str().unwrap().to_string(),
    }
}

/// Create a workspace owned by `owner` and return its id.
pub async fn create_workspace(app: &Router, owner: &TestUser, name: &str) -> i64 {
    let response = post_json_auth(
        app.clone(),
        "/api/v1/workspaces",
        serde_json::json!({ "name": name }),
        &owner.token,
    )
    .await;
    expect_data(response, StatusCode::CREATED).await["id"]
        .as_i64()
        .unwrap()
}

/// Add `user` to the workspace with `role`, acting as `admin`.
pub async fn add_member(app: &Router, ws: i64, admin: &TestUser, user: &TestUser, role: &str) {
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/members"),
        serde_json::json!({ "email": user.email, "role": role }),
        &admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Create a project and return its id.
pub async fn create_project(app: &Router, ws: i64, admin: &TestUser, name: &str, key: &str) -> i64 {
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/projects"),
        serde_json::json!({ "name": name, "key": key }),
        &admin.token,
    )
    .await;
    expect_data(response, StatusCode::CREATED).await["id"]
        .as_i64()
        .unwrap()
}

/// Create a task and return the created task JSON.
pub async fn create_task(
    app: &Router,
    ws: i64,
    project: i64,
    user: &TestUser,
    body: serde_json::Value,
) -> serde_json::Value {
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/projects/{project}/tasks"),
        body,
        &user.token,
    )
    .await;
    expect_data(response, StatusCode::CREATED).await
}
