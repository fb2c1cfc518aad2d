//! HTTP-level integration tests for tasks: numbering, status vocabulary,
//! board moves, bulk updates, subtasks, and completion toggling.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_project, create_task, create_workspace, delete_auth, expect_data, get_auth,
    patch_json_auth, post_json_auth, register, TestUser,
};
use sqlx::PgPool;

struct Board {
    app: axum::Router,
    owner: TestUser,
    ws: i64,
    project: i64,
}

async fn board(pool: PgPool) -> Board {
    let app = common::build_test_app(pool);
    let owner = register(&app, "owner@acme.test").await;
    let ws = create_workspace(&app, &owner, "Acme").await;
    let project = create_project(&app, ws, &owner, "Web", "WEB").await;
    Board {
        app,
        owner,
        ws,
        project,
    }
}

impl Board {
    async fn task(&self, title: &str) -> serde_json::Value {
        create_task(
            &self.app,
            self.ws,
            self.project,
            &self.owner,
            serde_json::json!({ "title": title }),
        )
        .await
    }

    async fn column(&self, status: &str) -> Vec<(i64, i64)> {
        let uri = format!(
            "/api/v1/workspaces/{}/projects/{}/tasks?status={status}",
            self.ws, self.project
        );
        let tasks = expect_data(
            get_auth(self.app.clone(), &uri, &self.owner.token).await,
            StatusCode::OK,
        )
        .await;
        tasks
            .as_array()
            .unwrap()
            .iter()
            .map(|t| (t["id"].as_i64().unwrap(), t["position"].as_i64().unwrap()))
            .collect()
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tasks_are_numbered_per_project(pool: PgPool) {
    let b = board(pool).await;
    let other = create_project(&b.app, b.ws, &b.owner, "Mobile", "MOB").await;

    assert_eq!(b.task("one").await["number"], 1);
    assert_eq!(b.task("two").await["number"], 2);

    let first_mobile = create_task(
        &b.app,
        b.ws,
        other,
        &b.owner,
        serde_json::json!({ "title": "mobile one" }),
    )
    .await;
    assert_eq!(first_mobile["number"], 1);
    assert_eq!(b.task("three").await["number"], 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn new_tasks_get_defaults(pool: PgPool) {
    let b = board(pool).await;

    let task = b.task("Defaults").await;

    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["type"], "task");
    assert_eq!(task["timeSpent"], 0);
    assert_eq!(task["creatorId"], b.owner.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn legacy_spellings_are_normalised(pool: PgPool) {
    let b = board(pool).await;

    let task = create_task(
        &b.app,
        b.ws,
        b.project,
        &b.owner,
        serde_json::json!({ "title": "Old client", "status": "inProgress", "priority": "urgent" }),
    )
    .await;
    assert_eq!(task["status"], "in_progress");
    assert_eq!(task["priority"], "critical");

    let task_id = task["id"].as_i64().unwrap();
    let response = patch_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/{task_id}", b.ws),
        serde_json::json!({ "status": "completed" }),
        &b.owner.token,
    )
    .await;
    assert_eq!(expect_data(response, StatusCode::OK).await["status"], "done");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_status_is_rejected(pool: PgPool) {
    let b = board(pool).await;

    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/projects/{}/tasks", b.ws, b.project),
        serde_json::json!({ "title": "Bad", "status": "blocked" }),
        &b.owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = get_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/projects/{}/tasks?status=blocked", b.ws, b.project),
        &b.owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn blank_title_is_rejected(pool: PgPool) {
    let b = board(pool).await;

    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/projects/{}/tasks", b.ws, b.project),
        serde_json::json!({ "title": "   " }),
        &b.owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn moves_keep_columns_dense(pool: PgPool) {
    let b = board(pool).await;
    let t1 = b.task("one").await["id"].as_i64().unwrap();
    let t2 = b.task("two").await["id"].as_i64().unwrap();
    let t3 = b.task("three").await["id"].as_i64().unwrap();
    assert_eq!(b.column("todo").await, vec![(t1, 0), (t2, 1), (t3, 2)]);

    // Reorder within the column.
    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/{t3}/move", b.ws),
        serde_json::json!({ "status": "todo", "position": 0 }),
        &b.owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(b.column("todo").await, vec![(t3, 0), (t1, 1), (t2, 2)]);

    // Move across columns; out-of-range positions append.
    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/{t1}/move", b.ws),
        serde_json::json!({ "status": "in_progress", "position": 99 }),
        &b.owner.token,
    )
    .await;
    let moved = expect_data(response, StatusCode::OK).await;
    assert_eq!(moved["status"], "in_progress");
    assert_eq!(moved["position"], 0);

    assert_eq!(b.column("todo").await, vec![(t3, 0), (t2, 1)]);
    assert_eq!(b.column("in_progress").await, vec![(t1, 0)]);
}

fn assert_dense(column: &[(i64, i64)], label: &str) {
    let mut positions: Vec<i64> = column.iter().map(|(_, p)| *p).collect();
    positions.sort_unstable();
    let expected: Vec<i64> = (0..column.len() as i64).collect();
    assert_eq!(positions, expected, "{label}: {column:?}");
}

/// Moves, status edits and deletes racing on one board leave every column
/// with unique, gap-free positions.
#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_position_writes_keep_columns_dense(pool: PgPool) {
    let b = board(pool).await;

    for round in 0..3 {
        let mut ids = Vec::new();
        for i in 0..6 {
            ids.push(b.task(&format!("r{round} t{i}")).await["id"].as_i64().unwrap());
        }
        let uri = |id: i64, suffix: &str| format!("/api/v1/workspaces/{}/tasks/{id}{suffix}", b.ws);
        let (move0, move1, move2) = (uri(ids[0], "/move"), uri(ids[1], "/move"), uri(ids[2], "/move"));
        let (edit3, delete4) = (uri(ids[3], ""), uri(ids[4], ""));

        let (m1, m2, m3, edit, del) = tokio::join!(
            post_json_auth(
                b.app.clone(),
                &move0,
                serde_json::json!({ "status": "in_progress", "position": 0 }),
                &b.owner.token,
            ),
            post_json_auth(
                b.app.clone(),
                &move1,
                serde_json::json!({ "status": "in_progress", "position": 0 }),
                &b.owner.token,
            ),
            post_json_auth(
                b.app.clone(),
                &move2,
                serde_json::json!({ "status": "todo", "position": 0 }),
                &b.owner.token,
            ),
            patch_json_auth(
                b.app.clone(),
                &edit3,
                serde_json::json!({ "status": "in_progress" }),
                &b.owner.token,
            ),
            delete_auth(b.app.clone(), &delete4, &b.owner.token),
        );
        for response in [m1, m2, m3, edit] {
            assert_eq!(response.status(), StatusCode::OK, "round {round}");
        }
        assert_eq!(del.status(), StatusCode::NO_CONTENT, "round {round}");

        assert_dense(&b.column("todo").await, "todo");
        assert_dense(&b.column("in_progress").await, "in_progress");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bulk_update_applies_to_every_task(pool: PgPool) {
    let b = board(pool).await;
    let t1 = b.task("one").await["id"].as_i64().unwrap();
    let t2 = b.task("two").await["id"].as_i64().unwrap();

    let response = patch_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/bulk", b.ws),
        serde_json::json!({
            "projectId": b.project,
            "taskIds": [t1, t2],
            "priority": "high",
        }),
        &b.owner.token,
    )
    .await;

    let tasks = expect_data(response, StatusCode::OK).await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t["priority"] == "high"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bulk_update_with_foreign_id_changes_nothing(pool: PgPool) {
    let b = board(pool).await;
    let t1 = b.task("one").await["id"].as_i64().unwrap();
    let other = create_project(&b.app, b.ws, &b.owner, "Mobile", "MOB").await;
    let foreign = create_task(
        &b.app,
        b.ws,
        other,
        &b.owner,
        serde_json::json!({ "title": "elsewhere" }),
    )
    .await["id"]
        .as_i64()
        .unwrap();

    let response = patch_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/bulk", b.ws),
        serde_json::json!({
            "projectId": b.project,
            "taskIds": [t1, foreign],
            "status": "done",
        }),
        &b.owner.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        format!("Task with id {foreign} not found")
    );

    let task = expect_data(
        get_auth(
            b.app.clone(),
            &format!("/api/v1/workspaces/{}/tasks/{t1}", b.ws),
            &b.owner.token,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(task["status"], "todo");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bulk_update_without_fields_is_rejected(pool: PgPool) {
    let b = board(pool).await;
    let t1 = b.task("one").await["id"].as_i64().unwrap();

    let response = patch_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/bulk", b.ws),
        serde_json::json!({ "projectId": b.project, "taskIds": [t1] }),
        &b.owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn subtask_progress_follows_children(pool: PgPool) {
    let b = board(pool).await;
    let parent = b.task("parent").await["id"].as_i64().unwrap();
    let subtasks_uri = format!("/api/v1/workspaces/{}/tasks/{parent}/subtasks", b.ws);

    let empty = expect_data(
        get_auth(b.app.clone(), &subtasks_uri, &b.owner.token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(empty["progress"]["percent"], 0);
    assert_eq!(empty["progress"]["total"], 0);

    let mut ids = Vec::new();
    for title in ["a", "b", "c"] {
        let response = post_json_auth(
            b.app.clone(),
            &subtasks_uri,
            serde_json::json!({ "title": title }),
            &b.owner.token,
        )
        .await;
        let subtask = expect_data(response, StatusCode::CREATED).await;
        assert_eq!(subtask["type"], "subtask");
        assert_eq!(subtask["parentId"], parent);
        ids.push(subtask["id"].as_i64().unwrap());
    }

    // Toggle with no body flips the current state.
    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/{}/toggle", b.ws, ids[0]),
        serde_json::json!({}),
        &b.owner.token,
    )
    .await;
    assert_eq!(expect_data(response, StatusCode::OK).await["status"], "done");

    let list = expect_data(
        get_auth(b.app.clone(), &subtasks_uri, &b.owner.token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(list["subtasks"].as_array().unwrap().len(), 3);
    assert_eq!(list["progress"]["completed"], 1);
    assert_eq!(list["progress"]["total"], 3);
    assert_eq!(list["progress"]["percent"], 33);

    let detail = expect_data(
        get_auth(
            b.app.clone(),
            &format!("/api/v1/workspaces/{}/tasks/{parent}", b.ws),
            &b.owner.token,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(detail["subtaskProgress"]["percent"], 33);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn subtasks_cannot_nest(pool: PgPool) {
    let b = board(pool).await;
    let parent = b.task("parent").await["id"].as_i64().unwrap();
    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/{parent}/subtasks", b.ws),
        serde_json::json!({ "title": "child" }),
        &b.owner.token,
    )
    .await;
    let child = expect_data(response, StatusCode::CREATED).await["id"]
        .as_i64()
        .unwrap();

    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/tasks/{child}/subtasks", b.ws),
        serde_json::json!({ "title": "grandchild" }),
        &b.owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn labels_from_another_project_are_rejected(pool: PgPool) {
    let b = board(pool).await;
    let other = create_project(&b.app, b.ws, &b.owner, "Mobile", "MOB").await;
    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/projects/{other}/labels", b.ws),
        serde_json::json!({ "name": "ios" }),
        &b.owner.token,
    )
    .await;
    let label = expect_data(response, StatusCode::CREATED).await["id"]
        .as_i64()
        .unwrap();

    let response = post_json_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{}/projects/{}/tasks", b.ws, b.project),
        serde_json::json!({ "title": "Tagged", "labelIds": [label] }),
        &b.owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn task_of_another_workspace_is_not_found(pool: PgPool) {
    let b = board(pool).await;
    let task = b.task("mine").await["id"].as_i64().unwrap();
    let other_ws = create_workspace(&b.app, &b.owner, "Other").await;

    let response = get_auth(
        b.app.clone(),
        &format!("/api/v1/workspaces/{other_ws}/tasks/{task}"),
        &b.owner.token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
