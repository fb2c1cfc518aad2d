//! HTTP-level integration tests for project stats, the workspace dashboard,
//! the activity log, and milestones.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{
    add_member, create_project, create_task, create_workspace, expect_data, get_auth,
    patch_json_auth, post_json_auth, register,
};
use sqlx::PgPool;
use taskdeck_events::EventBus;

/// Workspace "Acme", project "Web" with 1 done, 1 in_progress, 2 todo.
#[sqlx::test(migrations = "../../db/migrations")]
async fn acme_web_is_a_quarter_done(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    for (title, status) in [
        ("ship", "done"),
        ("build", "in_progress"),
        ("plan", "todo"),
        ("test", "todo"),
    ] {
        create_task(
            &app,
            ws,
            project,
            &owner,
            serde_json::json!({ "title": title, "status": status }),
        )
        .await;
    }

    let stats = expect_data(
        get_auth(
            app.clone(),
            &format!("/api/v1/workspaces/{ws}/projects/{project}/stats"),
            &owner.token,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(stats["total"], 4);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["inProgress"], 1);
    assert_eq!(stats["todo"], 2);
    assert_eq!(stats["completionPercent"], 25);

    let dashboard = expect_data(
        get_auth(app, &format!("/api/v1/workspaces/{ws}/dashboard"), &owner.token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(dashboard["total"], 4);
    assert_eq!(dashboard["completed"], 1);
    assert_eq!(dashboard["inProgress"], 1);
    assert_eq!(dashboard["completionPercent"], 25);
    assert_eq!(dashboard["projects"][0]["key"], "WEB");
    assert_eq!(dashboard["projects"][0]["stats"]["completionPercent"], 25);
    assert_eq!(dashboard["memberCount"], 1);
    assert!(dashboard["tasksByAssignee"].is_array());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn members_get_the_dashboard_without_admin_extras(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let member = register(&app, "member@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    add_member(&app, ws, &owner, &member, "member").await;

    let dashboard = expect_data(
        get_auth(app, &format!("/api/v1/workspaces/{ws}/dashboard"), &member.token).await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(dashboard["total"], 0);
    assert_eq!(dashboard["completionPercent"], 0);
    assert!(dashboard.get("memberCount").is_none());
    assert!(dashboard.get("tasksByAssignee").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn activity_log_records_mutations_newest_first(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let viewer = register(&app, "viewer@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    add_member(&app, ws, &owner, &viewer, "viewer").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    let task = create_task(&app, ws, project, &owner, serde_json::json!({ "title": "Log me" }))
        .await["id"]
        .as_i64()
        .unwrap();
    let response = patch_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/tasks/{task}"),
        serde_json::json!({ "title": "Logged" }),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = expect_data(
        get_auth(
            app.clone(),
            &format!("/api/v1/workspaces/{ws}/activity?entityType=task&entityId={task}"),
            &owner.token,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][0]["action"], "updated");
    assert_eq!(page["items"][1]["action"], "created");

    let response = get_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/activity?entityType=spaceship"),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get_auth(
        app,
        &format!("/api/v1/workspaces/{ws}/activity"),
        &viewer.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn milestone_progress_counts_its_tasks(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/workspaces/{ws}/projects/{project}/milestones"),
        serde_json::json!({
            "name": "Sprint 1",
            "type": "sprint",
            "startDate": "2026-03-02",
            "endDate": "2026-03-13",
            "assigneeIds": [owner.id],
        }),
        &owner.token,
    )
    .await;
    let milestone = expect_data(response, StatusCode::CREATED).await;
    let milestone_id = milestone["id"].as_i64().unwrap();
    assert_eq!(milestone["assigneeIds"], serde_json::json!([owner.id]));

    for status in ["done", "todo"] {
        create_task(
            &app,
            ws,
            project,
            &owner,
            serde_json::json!({ "title": status, "status": status, "milestoneId": milestone_id }),
        )
        .await;
    }

    let detail = expect_data(
        get_auth(
            app.clone(),
            &format!("/api/v1/workspaces/{ws}/milestones/{milestone_id}"),
            &owner.token,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(detail["progress"]["total"], 2);
    assert_eq!(detail["progress"]["completionPercent"], 50);

    // An update that would leave end before start is rejected.
    let response = patch_json_auth(
        app,
        &format!("/api/v1/workspaces/{ws}/milestones/{milestone_id}"),
        serde_json::json!({ "endDate": "2026-03-01" }),
        &owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mutations_publish_change_events(pool: PgPool) {
    let bus = Arc::new(EventBus::default());
    let app = common::build_test_app_with_bus(pool, Arc::clone(&bus));
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let mut events = bus.subscribe_workspace(ws);

    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    let task = create_task(&app, ws, project, &owner, serde_json::json!({ "title": "Hello" }))
        .await["id"]
        .as_i64()
        .unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(first.entity_type, "project");
    assert_eq!(first.entity_id, project);
    assert_eq!(first.action, "created");
    assert_eq!(first.actor_user_id, Some(owner.id));

    let second = events.recv().await.unwrap();
    assert_eq!(second.entity_type, "task");
    assert_eq!(second.entity_id, task);
    assert_eq!(second.payload["projectId"], project);
}
