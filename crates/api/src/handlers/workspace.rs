//! Handlers for workspaces.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::Action;
use taskdeck_core::roles::WorkspaceRole;
use taskdeck_core::workspace::{slugify, validate_slug, validate_workspace_name};
use taskdeck_db::models::workspace::{CreateWorkspace, UpdateWorkspace, WorkspaceWithRole};
use taskdeck_db::repositories::WorkspaceRepo;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::trim_optional;
use crate::middleware::auth::AuthUser;
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces
///
/// Workspaces the caller belongs to, each with the caller's role.
pub async fn list_workspaces(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let workspaces = WorkspaceRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: workspaces }))
}

/// POST /api/v1/workspaces
///
/// Create a workspace; the caller becomes its owner. Without an explicit
/// slug one is derived from the name.
pub async fn create_workspace(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateWorkspace>,
) -> AppResult<impl IntoResponse> {
    validate_workspace_name(&input.name)?;
    let name = input.name.trim();
    let slug = match input.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => slugify(name),
    };
    validate_slug(&slug)?;
    let description = trim_optional(input.description);

    let workspace =
        WorkspaceRepo::create(&state.pool, auth.user_id, name, &slug, description.as_deref())
            .await?;

    tracing::info!(workspace_id = workspace.id, user_id = auth.user_id, slug = %slug, "Workspace created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: WorkspaceWithRole {
                workspace,
                user_role: WorkspaceRole::Owner.as_str().to_string(),
            },
        }),
    ))
}

/// GET /api/v1/workspaces/{workspace_id}
pub async fn get_workspace(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let workspace = WorkspaceRepo::find_with_role(&state.pool, ctx.workspace_id, ctx.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workspace",
            id: ctx.workspace_id,
        }))?;
    Ok(Json(DataResponse { data: workspace }))
}

/// PATCH /api/v1/workspaces/{workspace_id}
pub async fn update_workspace(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    AppJson(mut input): AppJson<UpdateWorkspace>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::UpdateWorkspace)?;

    if let Some(name) = &input.name {
        validate_workspace_name(name)?;
        input.name = Some(name.trim().to_string());
    }
    if let Some(slug) = &input.slug {
        let slug = slug.trim().to_string();
        validate_slug(&slug)?;
        input.slug = Some(slug);
    }
    if let Some(description) = input.description.take() {
        input.description = Some(trim_optional(description));
    }

    let workspace = WorkspaceRepo::update(&state.pool, ctx.workspace_id, ctx.user_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workspace",
            id: ctx.workspace_id,
        }))?;

    state
        .event_bus
        .publish(ctx.change(entity_types::WORKSPACE, workspace.id, actions::UPDATED));
    tracing::info!(workspace_id = workspace.id, user_id = ctx.user_id, "Workspace updated");

    Ok(Json(DataResponse {
        data: WorkspaceWithRole {
            workspace,
            user_role: ctx.role.as_str().to_string(),
        },
    }))
}

/// DELETE /api/v1/workspaces/{workspace_id}
///
/// Owner only. Projects, tasks and memberships cascade.
pub async fn delete_workspace(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::DeleteWorkspace)?;

    let deleted = WorkspaceRepo::delete(&state.pool, ctx.workspace_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Workspace",
            id: ctx.workspace_id,
        }));
    }

    state
        .event_bus
        .publish(ctx.change(entity_types::WORKSPACE, ctx.workspace_id, actions::DELETED));
    tracing::info!(workspace_id = ctx.workspace_id, user_id = ctx.user_id, "Workspace deleted");

    Ok(StatusCode::NO_CONTENT)
}
