//! Handlers for project membership.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::Action;
use taskdeck_core::types::DbId;
use taskdeck_db::models::member::AddProjectMember;
use taskdeck_db::repositories::{MemberRepo, ProjectMemberRepo};

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::project_in_workspace;
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/projects/{project_id}/members
pub async fn list_project_members(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    project_in_workspace(&state, &ctx, project_id).await?;
    let members = ProjectMemberRepo::list(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/workspaces/{workspace_id}/projects/{project_id}/members
///
/// The user must already belong to the workspace.
pub async fn add_project_member(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
    AppJson(input): AppJson<AddProjectMember>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageProjects)?;
    project_in_workspace(&state, &ctx, project_id).await?;

    if MemberRepo::find(&state.pool, ctx.workspace_id, input.user_id)
        .await?
        .is_none()
    {
        return Err(AppError::Core(CoreError::Validation(format!(
            "User {} is not a member of this workspace",
            input.user_id
        ))));
    }

    let member = ProjectMemberRepo::add(&state.pool, project_id, input.user_id).await?;

    state.event_bus.publish(
        ctx.change(entity_types::PROJECT, project_id, actions::MEMBER_ADDED)
            .with_payload(serde_json::json!({ "userId": input.user_id })),
    );
    tracing::info!(project_id, member_user_id = input.user_id, user_id = ctx.user_id, "Project member added");

    Ok((StatusCode::CREATED, Json(DataResponse { data: member })))
}

/// DELETE /api/v1/workspaces/{workspace_id}/projects/{project_id}/members/{user_id}
pub async fn remove_project_member(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id, user_id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageProjects)?;
    project_in_workspace(&state, &ctx, project_id).await?;

    let removed = ProjectMemberRepo::remove(&state.pool, project_id, user_id).await?;
    if !removed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ProjectMember",
            id: user_id,
        }));
    }

    state.event_bus.publish(
        ctx.change(entity_types::PROJECT, project_id, actions::MEMBER_REMOVED)
            .with_payload(serde_json::json!({ "userId": user_id })),
    );
    tracing::info!(project_id, member_user_id = user_id, user_id = ctx.user_id, "Project member removed");

    Ok(StatusCode::NO_CONTENT)
}
