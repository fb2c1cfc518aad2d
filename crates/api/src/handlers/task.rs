//! Handlers for tasks: list, create, read, partial update, board moves,
//! bulk update and delete.
//!
//! Enum fields arrive in any accepted spelling (`inProgress`, `urgent`, ...)
//! and are rewritten to their canonical form before reaching the
//! repository. References (assignee, milestone, parent, labels) are checked
//! against the task's project and workspace here, so the repository can
//! trust its input.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::Action;
use taskdeck_core::task::{
    validate_bulk_ids, validate_description, validate_parent, validate_story_points,
    validate_title, TaskPriority, TaskStatus, TaskType,
};
use taskdeck_core::types::DbId;
use taskdeck_db::models::task::{
    BulkUpdateTasks, CreateTask, MoveTask, Task, TaskDetail, TaskFilter, UpdateTask,
};
use taskdeck_db::repositories::{LabelRepo, MemberRepo, MilestoneRepo, TaskRepo};

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::{project_in_workspace, task_in_workspace, trim_optional};
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/workspaces/{workspace_id}/projects/{project_id}/tasks
///
/// Tasks in board order. Supports `status`, `priority`, `type`,
/// `assigneeId`, `milestoneId`, `parentId`, `labelId`, `q`, `topLevel`,
/// `limit` and `offset`.
pub async fn list_tasks(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
    Query(mut filter): Query<TaskFilter>,
) -> AppResult<impl IntoResponse> {
    project_in_workspace(&state, &ctx, project_id).await?;

    filter.status = canonical_status(filter.status.as_deref())?;
    filter.priority = canonical_priority(filter.priority.as_deref())?;
    filter.task_type = canonical_type(filter.task_type.as_deref())?;

    let tasks = TaskRepo::list(&state.pool, project_id, &filter).await?;
    tracing::debug!(project_id, count = tasks.len(), "Listed tasks");

    Ok(Json(DataResponse { data: tasks }))
}

/// POST /api/v1/workspaces/{workspace_id}/projects/{project_id}/tasks
pub async fn create_task(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
    AppJson(input): AppJson<CreateTask>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::EditTasks)?;
    project_in_workspace(&state, &ctx, project_id).await?;

    let input = checked_create(&state, &ctx, project_id, input).await?;
    let task = TaskRepo::create(&state.pool, ctx.workspace_id, project_id, ctx.user_id, &input)
        .await?;

    publish_task_change(&state, &ctx, &task, actions::CREATED);
    tracing::info!(
        task_id = task.id,
        project_id,
        number = task.number,
        user_id = ctx.user_id,
        "Task created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// GET /api/v1/workspaces/{workspace_id}/tasks/{task_id}
///
/// The task with its labels and subtask progress.
pub async fn get_task(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let task = task_in_workspace(&state, &ctx, task_id).await?;
    let labels = LabelRepo::list_for_task(&state.pool, task.id).await?;
    let subtask_progress = TaskRepo::subtask_progress(&state.pool, task.id).await?;

    Ok(Json(DataResponse {
        data: TaskDetail {
            task,
            labels,
            subtask_progress,
        },
    }))
}

/// PATCH /api/v1/workspaces/{workspace_id}/tasks/{task_id}
///
/// Partial update. Absent keys are left alone; `null` clears nullable
/// fields; `labelIds` replaces the label set.
pub async fn update_task(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
    AppJson(input): AppJson<UpdateTask>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::EditTasks)?;
    let existing = task_in_workspace(&state, &ctx, task_id).await?;

    let input = checked_update(&state, &ctx, existing.project_id, input).await?;
    let task = TaskRepo::update(&state.pool, ctx.workspace_id, task_id, ctx.user_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }))?;

    publish_task_change(&state, &ctx, &task, actions::UPDATED);
    tracing::info!(task_id, user_id = ctx.user_id, "Task updated");

    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/workspaces/{workspace_id}/tasks/{task_id}/move
///
/// Place the task in `status` at `position`; positions in both the old and
/// the new column stay dense.
pub async fn move_task(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
    AppJson(input): AppJson<MoveTask>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::EditTasks)?;
    task_in_workspace(&state, &ctx, task_id).await?;
    let status = TaskStatus::parse_input(&input.status)?;

    let task = TaskRepo::move_task(
        &state.pool,
        ctx.workspace_id,
        task_id,
        ctx.user_id,
        status.as_str(),
        input.position,
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Task",
        id: task_id,
    }))?;

    publish_task_change(&state, &ctx, &task, actions::MOVED);
    tracing::info!(
        task_id,
        status = %status,
        position = task.position,
        user_id = ctx.user_id,
        "Task moved"
    );

    Ok(Json(DataResponse { data: task }))
}

/// PATCH /api/v1/workspaces/{workspace_id}/tasks/bulk
///
/// Apply `status`, `priority`, `assigneeId` and/or `milestoneId` to up to
/// 100 tasks of one project. Any id outside the project fails the whole
/// request with 404 and nothing is written.
pub async fn bulk_update_tasks(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    AppJson(input): AppJson<BulkUpdateTasks>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::EditTasks)?;
    let ids = validate_bulk_ids(&input.task_ids)?;
    if input.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Bulk update must set at least one of status, priority, assigneeId, milestoneId"
                .into(),
        )));
    }
    let project_id = input.project_id;
    project_in_workspace(&state, &ctx, project_id).await?;

    let update = checked_update(&state, &ctx, project_id, input.as_update()).await?;

    let missing = TaskRepo::missing_from_project(&state.pool, project_id, &ids).await?;
    if let Some(&id) = missing.first() {
        return Err(AppError::Core(CoreError::NotFound { entity: "Task", id }));
    }

    let tasks = TaskRepo::bulk_update(
        &state.pool,
        ctx.workspace_id,
        project_id,
        &ids,
        ctx.user_id,
        &update,
    )
    .await?
    // A task deleted between the check and the write.
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Task",
        id: ids[0],
    }))?;

    for task in &tasks {
        publish_task_change(&state, &ctx, task, actions::UPDATED);
    }
    tracing::info!(project_id, count = tasks.len(), user_id = ctx.user_id, "Tasks bulk updated");

    Ok(Json(DataResponse { data: tasks }))
}

/// DELETE /api/v1/workspaces/{workspace_id}/tasks/{task_id}
///
/// Subtasks, time entries and label links go with it.
pub async fn delete_task(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::EditTasks)?;
    let task = task_in_workspace(&state, &ctx, task_id).await?;

    let deleted = TaskRepo::delete(&state.pool, ctx.workspace_id, task_id, ctx.user_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }));
    }

    publish_task_change(&state, &ctx, &task, actions::DELETED);
    tracing::info!(task_id, user_id = ctx.user_id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Input checks
// ---------------------------------------------------------------------------

/// Validate a create request against `project_id` and canonicalise it.
pub(crate) async fn checked_create(
    state: &AppState,
    ctx: &WorkspaceContext,
    project_id: DbId,
    mut input: CreateTask,
) -> AppResult<CreateTask> {
    validate_title(&input.title)?;
    input.title = input.title.trim().to_string();
    input.description = trim_optional(input.description);
    if let Some(description) = &input.description {
        validate_description(description)?;
    }

    input.status = canonical_status(input.status.as_deref())?;
    input.priority = canonical_priority(input.priority.as_deref())?;
    input.task_type = canonical_type(input.task_type.as_deref())?;
    if let Some(points) = input.story_points {
        validate_story_points(points)?;
    }

    if let Some(assignee_id) = input.assignee_id {
        check_assignee(state, ctx, assignee_id).await?;
    }
    if let Some(milestone_id) = input.milestone_id {
        check_milestone(state, ctx, project_id, milestone_id).await?;
    }
    if let Some(parent_id) = input.parent_id {
        let parent = task_in_workspace(state, ctx, parent_id).await?;
        if parent.project_id != project_id {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Parent task {parent_id} belongs to a different project"
            ))));
        }
        validate_parent(None, parent.id, parent.parent_id)?;
    }
    input.label_ids = check_labels(state, project_id, &input.label_ids).await?;

    Ok(input)
}

/// Validate a partial update of a task in `project_id` and canonicalise it.
async fn checked_update(
    state: &AppState,
    ctx: &WorkspaceContext,
    project_id: DbId,
    mut input: UpdateTask,
) -> AppResult<UpdateTask> {
    if let Some(title) = &input.title {
        validate_title(title)?;
        input.title = Some(title.trim().to_string());
    }
    if let Some(description) = input.description.take() {
        let description = trim_optional(description);
        if let Some(text) = &description {
            validate_description(text)?;
        }
        input.description = Some(description);
    }

    input.status = canonical_status(input.status.as_deref())?;
    input.priority = canonical_priority(input.priority.as_deref())?;
    input.task_type = canonical_type(input.task_type.as_deref())?;
    if let Some(Some(points)) = input.story_points {
        validate_story_points(points)?;
    }

    if let Some(Some(assignee_id)) = input.assignee_id {
        check_assignee(state, ctx, assignee_id).await?;
    }
    if let Some(Some(milestone_id)) = input.milestone_id {
        check_milestone(state, ctx, project_id, milestone_id).await?;
    }
    if let Some(label_ids) = &input.label_ids {
        input.label_ids = Some(check_labels(state, project_id, label_ids).await?);
    }

    Ok(input)
}

fn canonical_status(raw: Option<&str>) -> AppResult<Option<String>> {
    Ok(raw
        .map(TaskStatus::parse_input)
        .transpose()?
        .map(|s| s.as_str().to_string()))
}

fn canonical_priority(raw: Option<&str>) -> AppResult<Option<String>> {
    Ok(raw
        .map(TaskPriority::parse_input)
        .transpose()?
        .map(|p| p.as_str().to_string()))
}

fn canonical_type(raw: Option<&str>) -> AppResult<Option<String>> {
    Ok(raw
        .map(str::parse::<TaskType>)
        .transpose()?
        .map(|t| t.as_str().to_string()))
}

async fn check_assignee(state: &AppState, ctx: &WorkspaceContext, user_id: DbId) -> AppResult<()> {
    if MemberRepo::find(&state.pool, ctx.workspace_id, user_id)
        .await?
        .is_none()
    {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Assignee {user_id} is not a member of this workspace"
        ))));
    }
    Ok(())
}

async fn check_milestone(
    state: &AppState,
    ctx: &WorkspaceContext,
    project_id: DbId,
    milestone_id: DbId,
) -> AppResult<()> {
    let milestone = MilestoneRepo::find_in_workspace(&state.pool, ctx.workspace_id, milestone_id)
        .await?;
    match milestone {
        Some(m) if m.project_id == project_id => Ok(()),
        _ => Err(AppError::Core(CoreError::Validation(format!(
            "Milestone {milestone_id} does not belong to this project"
        )))),
    }
}

/// De-duplicate label ids and require each to be a label of `project_id`.
async fn check_labels(state: &AppState, project_id: DbId, ids: &[DbId]) -> AppResult<Vec<DbId>> {
    let mut seen = HashSet::new();
    let unique: Vec<DbId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if unique.is_empty() {
        return Ok(unique);
    }

    let found = LabelRepo::count_in_project(&state.pool, project_id, &unique).await?;
    if found != unique.len() as i64 {
        return Err(AppError::Core(CoreError::Validation(
            "Every label must belong to the task's project".into(),
        )));
    }
    Ok(unique)
}

pub(crate) fn publish_task_change(
    state: &AppState,
    ctx: &WorkspaceContext,
    task: &Task,
    action: &str,
) {
    state.event_bus.publish(
        ctx.change(entity_types::TASK, task.id, action).with_payload(json!({
            "projectId": task.project_id,
            "parentId": task.parent_id,
            "status": task.status,
        })),
    );
}
