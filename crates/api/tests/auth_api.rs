//! HTTP-level integration tests for `/auth`: register, login, and `me`.

mod common;

use axum::http::StatusCode;
use common::{body_json, expect_data, get, get_auth, post_json, register};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_returns_token_and_user(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = serde_json::json!({
        "email": "  Ada@Example.COM ",
        "name": "Ada",
        "password": "correct-horse-battery",
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["accessToken"].is_string());
    assert_eq!(json["expiresIn"], 3600);
    assert_eq!(json["user"]["email"], "ada@example.com");
    assert_eq!(json["user"]["name"], "Ada");
    assert!(json["user"].get("passwordHash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_is_a_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    register(&app, "ada@example.com").await;

    let body = serde_json::json!({
        "email": "ADA@example.com",
        "name": "Other Ada",
        "password": "correct-horse-battery",
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn short_password_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "email": "a@b.test", "name": "A", "password": "short" });
    let response = post_json(app, "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_then_me(pool: PgPool) {
    let app = common::build_test_app(pool);
    let user = register(&app, "grace@example.com").await;

    let body = serde_json::json!({
        "email": "grace@example.com",
        "password": "correct-horse-battery",
    });
    let response = post_json(app.clone(), "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["accessToken"]
        .as_str()
        .unwrap()
        .to_string();

    let me = expect_data(get_auth(app, "/api/v1/auth/me", &token).await, StatusCode::OK).await;
    assert_eq!(me["id"], user.id);
    assert_eq!(me["email"], "grace@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_password_and_unknown_email_are_both_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    register(&app, "grace@example.com").await;

    let wrong = serde_json::json!({ "email": "grace@example.com", "password": "nope-nope-nope" });
    let response = post_json(app.clone(), "/api/v1/auth/login", wrong).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let unknown = serde_json::json!({ "email": "ghost@example.com", "password": "whatever123" });
    let response = post_json(app, "/api/v1/auth/login", unknown).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_rejects_missing_or_garbage_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app.clone(), "/api/v1/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app, "/api/v1/auth/me", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_json_is_a_bad_request(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/api/v1/auth/login", serde_json::json!({ "email": 5 })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}
