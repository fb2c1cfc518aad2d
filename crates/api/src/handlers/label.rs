//! Handlers for project labels.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::Action;
use taskdeck_core::project::{validate_color, validate_label_name};
use taskdeck_core::types::DbId;
use taskdeck_db::models::label::CreateLabel;
use taskdeck_db::repositories::LabelRepo;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::project_in_workspace;
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/projects/{project_id}/labels
pub async fn list_labels(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    project_in_workspace(&state, &ctx, project_id).await?;
    let labels = LabelRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: labels }))
}

/// POST /api/v1/workspaces/{workspace_id}/projects/{project_id}/labels
pub async fn create_label(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
    AppJson(mut input): AppJson<CreateLabel>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageLabels)?;
    project_in_workspace(&state, &ctx, project_id).await?;

    validate_label_name(&input.name)?;
    input.name = input.name.trim().to_string();
    if let Some(color) = &input.color {
        validate_color(color)?;
    }

    let label =
        LabelRepo::create(&state.pool, ctx.workspace_id, project_id, ctx.user_id, &input).await?;

    state
        .event_bus
        .publish(ctx.change(entity_types::LABEL, label.id, actions::CREATED));
    tracing::info!(label_id = label.id, project_id, user_id = ctx.user_id, "Label created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: label })))
}

/// DELETE /api/v1/workspaces/{workspace_id}/projects/{project_id}/labels/{label_id}
pub async fn delete_label(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id, label_id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageLabels)?;
    project_in_workspace(&state, &ctx, project_id).await?;

    let deleted =
        LabelRepo::delete(&state.pool, ctx.workspace_id, project_id, label_id, ctx.user_id)
            .await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Label",
            id: label_id,
        }));
    }

    state
        .event_bus
        .publish(ctx.change(entity_types::LABEL, label_id, actions::DELETED));
    tracing::info!(label_id, project_id, user_id = ctx.user_id, "Label deleted");

    Ok(StatusCode::NO_CONTENT)
}
