//! HTTP-level integration tests for time entries and `timeSpent`
//! bookkeeping.

mod common;

use axum::http::StatusCode;
use common::{
    add_member, body_json, create_project, create_task, create_workspace, delete_auth,
    expect_data, get_auth, post_json_auth, register, TestUser,
};
use sqlx::PgPool;

async fn time_spent(app: &axum::Router, ws: i64, task: i64, user: &TestUser) -> i64 {
    let task = expect_data(
        get_auth(app.clone(), &format!("/api/v1/workspaces/{ws}/tasks/{task}"), &user.token).await,
        StatusCode::OK,
    )
    .await;
    task["timeSpent"].as_i64().unwrap()
}

async fn log_time(
    app: &axum::Router,
    ws: i64,
    task: i64,
    user: &TestUser,
    body: serde_json::Value,
) -> axum::response::Response {
    post_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/tasks/{task}/time-entries"),
        body,
        &user.token,
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_then_delete_restores_time_spent(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    let task = create_task(&app, ws, project, &owner, serde_json::json!({ "title": "Work" }))
        .await["id"]
        .as_i64()
        .unwrap();

    let response = log_time(
        &app,
        ws,
        task,
        &owner,
        serde_json::json!({ "duration": 45, "description": "  pairing  ", "date": "2026-03-02" }),
    )
    .await;
    let entry = expect_data(response, StatusCode::CREATED).await;
    assert_eq!(entry["duration"], 45);
    assert_eq!(entry["description"], "pairing");
    assert_eq!(entry["date"], "2026-03-02");
    assert_eq!(entry["userId"], owner.id);
    assert_eq!(time_spent(&app, ws, task, &owner).await, 45);

    let second = log_time(&app, ws, task, &owner, serde_json::json!({ "duration": 15 })).await;
    assert_eq!(second.status(), StatusCode::CREATED);
    assert_eq!(time_spent(&app, ws, task, &owner).await, 60);

    let list = get_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/tasks/{task}/time-entries"),
        &owner.token,
    )
    .await;
    assert_eq!(list.status(), StatusCode::OK);
    let list = body_json(list).await;
    assert_eq!(list["timeEntries"].as_array().unwrap().len(), 2);

    let response = delete_auth(
        app.clone(),
        &format!(
            "/api/v1/workspaces/{ws}/tasks/{task}/time-entries?entryId={}",
            entry["id"]
        ),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(time_spent(&app, ws, task, &owner).await, 15);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_positive_duration_is_rejected_without_mutation(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    let task = create_task(&app, ws, project, &owner, serde_json::json!({ "title": "Work" }))
        .await["id"]
        .as_i64()
        .unwrap();

    for duration in [0, -30] {
        let response =
            log_time(&app, ws, task, &owner, serde_json::json!({ "duration": duration })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    assert_eq!(time_spent(&app, ws, task, &owner).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn end_before_start_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    let task = create_task(&app, ws, project, &owner, serde_json::json!({ "title": "Work" }))
        .await["id"]
        .as_i64()
        .unwrap();

    let response = log_time(
        &app,
        ws,
        task,
        &owner,
        serde_json::json!({
            "duration": 30,
            "startTime": "2026-03-02T10:00:00Z",
            "endTime": "2026-03-02T09:00:00Z",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn entry_of_another_task_is_not_found(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    let a = create_task(&app, ws, project, &owner, serde_json::json!({ "title": "A" }))
        .await["id"]
        .as_i64()
        .unwrap();
    let b = create_task(&app, ws, project, &owner, serde_json::json!({ "title": "B" }))
        .await["id"]
        .as_i64()
        .unwrap();

    let entry = expect_data(
        log_time(&app, ws, a, &owner, serde_json::json!({ "duration": 20 })).await,
        StatusCode::CREATED,
    )
    .await;

    let response = delete_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/tasks/{b}/time-entries?entryId={}", entry["id"]),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(time_spent(&app, ws, a, &owner).await, 20);
    assert_eq!(time_spent(&app, ws, b, &owner).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_admins_delete_other_peoples_entries(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let alice = register(&app, "alice@acme.test").await;
    let bob = register(&app, "bob@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    add_member(&app, ws, &owner, &alice, "member").await;
    add_member(&app, ws, &owner, &bob, "member").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    let task = create_task(&app, ws, project, &alice, serde_json::json!({ "title": "Work" }))
        .await["id"]
        .as_i64()
        .unwrap();

    let entry = expect_data(
        log_time(&app, ws, task, &alice, serde_json::json!({ "duration": 30 })).await,
        StatusCode::CREATED,
    )
    .await;
    let uri = format!(
        "/api/v1/workspaces/{ws}/tasks/{task}/time-entries?entryId={}",
        entry["id"]
    );

    let response = delete_auth(app.clone(), &uri, &bob.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(time_spent(&app, ws, task, &owner).await, 30);

    let response = delete_auth(app.clone(), &uri, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(time_spent(&app, ws, task, &owner).await, 0);
}
