//! Handlers for projects.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::Action;
use taskdeck_core::project::{
    normalize_project_key, validate_color, validate_project_name, ProjectStatus,
};
use taskdeck_core::types::DbId;
use taskdeck_db::models::project::{CreateProject, ProjectQuery, UpdateProject};
use taskdeck_db::repositories::{ProjectRepo, TaskRepo};

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::{project_in_workspace, trim_optional};
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/projects
pub async fn list_projects(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Query(params): Query<ProjectQuery>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<ProjectStatus>)
        .transpose()?;

    let projects =
        ProjectRepo::list(&state.pool, ctx.workspace_id, status.map(ProjectStatus::as_str)).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// POST /api/v1/workspaces/{workspace_id}/projects
pub async fn create_project(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    AppJson(mut input): AppJson<CreateProject>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageProjects)?;

    validate_project_name(&input.name)?;
    input.name = input.name.trim().to_string();
    input.key = normalize_project_key(&input.key)?;
    input.description = trim_optional(input.description);
    if let Some(status) = &input.status {
        status.parse::<ProjectStatus>()?;
    }
    if let Some(color) = &input.color {
        validate_color(color)?;
    }

    let project = ProjectRepo::create(&state.pool, ctx.workspace_id, ctx.user_id, &input).await?;

    state
        .event_bus
        .publish(ctx.change(entity_types::PROJECT, project.id, actions::CREATED));
    tracing::info!(
        project_id = project.id,
        workspace_id = ctx.workspace_id,
        key = %project.key,
        user_id = ctx.user_id,
        "Project created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/workspaces/{workspace_id}/projects/{project_id}
pub async fn get_project(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let project = project_in_workspace(&state, &ctx, project_id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PATCH /api/v1/workspaces/{workspace_id}/projects/{project_id}
pub async fn update_project(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
    AppJson(mut input): AppJson<UpdateProject>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageProjects)?;

    if let Some(name) = &input.name {
        validate_project_name(name)?;
        input.name = Some(name.trim().to_string());
    }
    if let Some(key) = &input.key {
        input.key = Some(normalize_project_key(key)?);
    }
    if let Some(description) = input.description.take() {
        input.description = Some(trim_optional(description));
    }
    if let Some(status) = &input.status {
        status.parse::<ProjectStatus>()?;
    }
    if let Some(color) = &input.color {
        validate_color(color)?;
    }

    let project = ProjectRepo::update(&state.pool, ctx.workspace_id, project_id, ctx.user_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;

    state
        .event_bus
        .publish(ctx.change(entity_types::PROJECT, project.id, actions::UPDATED));
    tracing::info!(project_id, user_id = ctx.user_id, "Project updated");

    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/workspaces/{workspace_id}/projects/{project_id}
///
/// Tasks, milestones and labels of the project cascade.
pub async fn delete_project(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageProjects)?;

    let deleted =
        ProjectRepo::delete(&state.pool, ctx.workspace_id, project_id, ctx.user_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }));
    }

    state
        .event_bus
        .publish(ctx.change(entity_types::PROJECT, project_id, actions::DELETED));
    tracing::info!(project_id, user_id = ctx.user_id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/workspaces/{workspace_id}/projects/{project_id}/stats
///
/// Status breakdown and completion percentage over every task, subtasks
/// included.
pub async fn project_stats(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    project_in_workspace(&state, &ctx, project_id).await?;
    let stats = TaskRepo::stats_for_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: stats }))
}
