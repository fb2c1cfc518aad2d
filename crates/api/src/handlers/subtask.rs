//! Handlers for subtasks and completion toggling.
//!
//! Subtasks are ordinary tasks with `parentId` set and type `subtask`; the
//! tree is one level deep.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::actions;
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::Action;
use taskdeck_core::task::{validate_parent, TaskStatus, TaskType};
use taskdeck_core::types::DbId;
use taskdeck_db::models::task::{CreateTask, SubtaskList, ToggleTask, UpdateTask};
use taskdeck_db::repositories::TaskRepo;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::task::{checked_create, publish_task_change};
use crate::handlers::task_in_workspace;
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/tasks/{task_id}/subtasks
pub async fn list_subtasks(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    task_in_workspace(&state, &ctx, task_id).await?;

    let subtasks = TaskRepo::list_subtasks(&state.pool, task_id).await?;
    let progress = TaskRepo::subtask_progress(&state.pool, task_id).await?;

    Ok(Json(DataResponse {
        data: SubtaskList { subtasks, progress },
    }))
}

/// POST /api/v1/workspaces/{workspace_id}/tasks/{task_id}/subtasks
///
/// Creates a `subtask` in the parent's project. The parent's milestone is
/// inherited unless the body names another.
pub async fn create_subtask(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
    AppJson(mut input): AppJson<CreateTask>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::EditTasks)?;
    let parent = task_in_workspace(&state, &ctx, task_id).await?;
    validate_parent(None, parent.id, parent.parent_id)?;

    input.parent_id = Some(parent.id);
    input.task_type = Some(TaskType::Subtask.as_str().to_string());
    if input.milestone_id.is_none() {
        input.milestone_id = parent.milestone_id;
    }

    let input = checked_create(&state, &ctx, parent.project_id, input).await?;
    let subtask =
        TaskRepo::create(&state.pool, ctx.workspace_id, parent.project_id, ctx.user_id, &input)
            .await?;

    publish_task_change(&state, &ctx, &subtask, actions::CREATED);
    tracing::info!(
        task_id = subtask.id,
        parent_id = parent.id,
        user_id = ctx.user_id,
        "Subtask created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: subtask })))
}

/// POST /api/v1/workspaces/{workspace_id}/tasks/{task_id}/toggle
///
/// Mark the task complete (`done`) or incomplete (`todo`). Without
/// `completed` in the body the current state is flipped.
pub async fn toggle_task(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
    AppJson(input): AppJson<ToggleTask>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::EditTasks)?;
    let existing = task_in_workspace(&state, &ctx, task_id).await?;

    let currently_complete = TaskStatus::parse_input(&existing.status)
        .map(TaskStatus::is_complete)
        .unwrap_or(false);
    let completed = input.completed.unwrap_or(!currently_complete);
    let status = TaskStatus::for_completion(completed);

    let update = UpdateTask {
        status: Some(status.as_str().to_string()),
        ..Default::default()
    };
    let task = TaskRepo::update(&state.pool, ctx.workspace_id, task_id, ctx.user_id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }))?;

    publish_task_change(&state, &ctx, &task, actions::UPDATED);
    tracing::info!(task_id, completed, user_id = ctx.user_id, "Task completion toggled");

    Ok(Json(DataResponse { data: task }))
}
