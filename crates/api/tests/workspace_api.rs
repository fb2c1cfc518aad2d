//! HTTP-level integration tests for workspaces, membership, and role
//! enforcement.

mod common;

use axum::http::StatusCode;
use common::{
    add_member, body_json, create_project, create_workspace, delete_auth, expect_data, get_auth,
    patch_json_auth, post_json_auth, register,
};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn creator_becomes_owner(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/workspaces",
        serde_json::json!({ "name": "Acme Corp" }),
        &owner.token,
    )
    .await;
    let workspace = expect_data(response, StatusCode::CREATED).await;
    assert_eq!(workspace["slug"], "acme-corp");
    assert_eq!(workspace["userRole"], "owner");

    let list = expect_data(
        get_auth(app, "/api/v1/workspaces", &owner.token).await,
        StatusCode::OK,
    )
    .await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], workspace["id"]);
    assert_eq!(list[0]["userRole"], "owner");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_slug_is_a_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    create_workspace(&app, &owner, "Acme").await;

    let response = post_json_auth(
        app,
        "/api/v1/workspaces",
        serde_json::json!({ "name": "Acme" }),
        &owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_members_see_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let outsider = register(&app, "outsider@else.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;

    let response = get_auth(app.clone(), &format!("/api/v1/workspaces/{ws}"), &outsider.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(
        app,
        &format!("/api/v1/workspaces/{ws}/projects/{project}/tasks"),
        &outsider.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn viewer_cannot_mutate(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let viewer = register(&app, "viewer@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    add_member(&app, ws, &owner, &viewer, "viewer").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    let task = common::create_task(
        &app,
        ws,
        project,
        &owner,
        serde_json::json!({ "title": "Ship it" }),
    )
    .await;
    let task_id = task["id"].as_i64().unwrap();

    // Reads are fine.
    let response = get_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/tasks/{task_id}"),
        &viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/projects/{project}/tasks"),
        serde_json::json!({ "title": "Sneaky" }),
        &viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    let response = patch_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/tasks/{task_id}"),
        serde_json::json!({ "title": "Renamed" }),
        &viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/tasks/{task_id}/time-entries"),
        serde_json::json!({ "duration": 30 }),
        &viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(
        app,
        &format!("/api/v1/workspaces/{ws}/tasks/{task_id}"),
        &viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn members_cannot_manage_projects(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let member = register(&app, "member@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    add_member(&app, ws, &owner, &member, "member").await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/workspaces/{ws}/projects"),
        serde_json::json!({ "name": "Web", "key": "WEB" }),
        &member.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn last_owner_cannot_be_demoted_or_removed(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let member_uri = format!("/api/v1/workspaces/{ws}/members/{}", owner.id);

    let response = patch_json_auth(
        app.clone(),
        &member_uri,
        serde_json::json!({ "role": "admin" }),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = delete_auth(app.clone(), &member_uri, &owner.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // With a second owner the first may step down.
    let second = register(&app, "second@acme.test").await;
    add_member(&app, ws, &owner, &second, "owner").await;
    let response = patch_json_auth(
        app,
        &member_uri,
        serde_json::json!({ "role": "admin" }),
        &owner.token,
    )
    .await;
    let member = expect_data(response, StatusCode::OK).await;
    assert_eq!(member["role"], "admin");
}

/// Two owners demoting each other at the same time: exactly one wins.
#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_owner_demotions_keep_an_owner(pool: PgPool) {
    let app = common::build_test_app(pool);
    let first = register(&app, "first@acme.test").await;
    let second = register(&app, "second@acme.test").await;

    for round in 0..5 {
        let ws = create_workspace(&app, &first, &format!("Acme {round}")).await;
        add_member(&app, ws, &first, &second, "owner").await;

        let second_uri = format!("/api/v1/workspaces/{ws}/members/{}", second.id);
        let first_uri = format!("/api/v1/workspaces/{ws}/members/{}", first.id);
        let (a, b) = tokio::join!(
            patch_json_auth(
                app.clone(),
                &second_uri,
                serde_json::json!({ "role": "admin" }),
                &first.token,
            ),
            patch_json_auth(
                app.clone(),
                &first_uri,
                serde_json::json!({ "role": "admin" }),
                &second.token,
            ),
        );
        let statuses = [a.status(), b.status()];
        assert_eq!(
            statuses.iter().filter(|s| **s == StatusCode::OK).count(),
            1,
            "round {round}: {statuses:?}"
        );
        assert!(
            statuses
                .iter()
                .any(|s| *s == StatusCode::CONFLICT || *s == StatusCode::FORBIDDEN),
            "round {round}: {statuses:?}"
        );

        let members = expect_data(
            get_auth(app.clone(), &format!("/api/v1/workspaces/{ws}/members"), &first.token).await,
            StatusCode::OK,
        )
        .await;
        let owners = members
            .as_array()
            .unwrap()
            .iter()
            .filter(|m| m["role"] == "owner")
            .count();
        assert_eq!(owners, 1, "round {round}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admins_cannot_grant_ownership(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let admin = register(&app, "admin@acme.test").await;
    let newcomer = register(&app, "new@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    add_member(&app, ws, &owner, &admin, "admin").await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/workspaces/{ws}/members"),
        serde_json::json!({ "email": newcomer.email, "role": "owner" }),
        &admin.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn adding_unknown_email_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;

    let response = post_json_auth(
        app,
        &format!("/api/v1/workspaces/{ws}/members"),
        serde_json::json!({ "email": "nobody@acme.test" }),
        &owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn members_may_leave(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let member = register(&app, "member@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    add_member(&app, ws, &owner, &member, "member").await;

    let response = delete_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/members/{}", member.id),
        &member.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app, &format!("/api/v1/workspaces/{ws}"), &member.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn owner_deletes_workspace(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let admin = register(&app, "admin@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    add_member(&app, ws, &owner, &admin, "admin").await;

    let uri = format!("/api/v1/workspaces/{ws}");
    let response = delete_auth(app.clone(), &uri, &admin.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(app.clone(), &uri, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app, &uri, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
