//! Handlers for workspace membership.
//!
//! Role rules live in `taskdeck_core::policy`; these handlers only load the
//! facts the policy needs (target role, owner count) under the workspace
//! lock, inside the same transaction as the write.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::{check_member_grant, check_member_removal, check_role_change};
use taskdeck_core::roles::{WorkspaceRole, DEFAULT_MEMBER_ROLE};
use taskdeck_core::types::DbId;
use taskdeck_db::models::member::{AddMember, MemberWithUser, UpdateMemberRole};
use taskdeck_db::repositories::{MemberRepo, MembershipFacts, UserRepo};

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::auth::normalize_email;
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/members
pub async fn list_members(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let members = MemberRepo::list(&state.pool, ctx.workspace_id).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/workspaces/{workspace_id}/members
///
/// Add a registered user by email. Only owners may add another owner.
pub async fn add_member(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    AppJson(input): AppJson<AddMember>,
) -> AppResult<impl IntoResponse> {
    let role = match input.role.as_deref() {
        Some(raw) => raw.parse::<WorkspaceRole>()?,
        None => DEFAULT_MEMBER_ROLE,
    };
    check_member_grant(ctx.role, role)?;

    let email = normalize_email(&input.email)?;
    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "No registered user with email '{email}'"
            )))
        })?;

    let member = MemberRepo::add(&state.pool, ctx.workspace_id, user.id, role, ctx.user_id).await?;

    state.event_bus.publish(
        ctx.change(entity_types::MEMBER, user.id, actions::MEMBER_ADDED)
            .with_payload(serde_json::json!({ "role": role.as_str() })),
    );
    tracing::info!(
        workspace_id = ctx.workspace_id,
        member_user_id = user.id,
        role = %role,
        user_id = ctx.user_id,
        "Member added"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: MemberWithUser {
                user_id: user.id,
                email: user.email,
                name: user.name,
                role: member.role,
                joined_at: member.joined_at,
            },
        }),
    ))
}

/// PATCH /api/v1/workspaces/{workspace_id}/members/{user_id}
pub async fn update_member_role(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, user_id)): Path<(DbId, DbId)>,
    AppJson(input): AppJson<UpdateMemberRole>,
) -> AppResult<impl IntoResponse> {
    let new_role = input.role.parse::<WorkspaceRole>()?;

    let (member, previous) = MemberRepo::update_role(
        &state.pool,
        ctx.workspace_id,
        user_id,
        new_role,
        ctx.user_id,
        |facts: &MembershipFacts| -> AppResult<()> {
            let current = stored_role(&facts.current_role)?;
            check_role_change(ctx.role, current, new_role, facts.owner_count)?;
            Ok(())
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Member",
        id: user_id,
    }))?;

    state.event_bus.publish(
        ctx.change(entity_types::MEMBER, user_id, actions::ROLE_CHANGED)
            .with_payload(serde_json::json!({ "from": previous, "to": new_role.as_str() })),
    );
    tracing::info!(
        workspace_id = ctx.workspace_id,
        member_user_id = user_id,
        from = %previous,
        to = %new_role,
        user_id = ctx.user_id,
        "Member role changed"
    );

    Ok(Json(DataResponse { data: member }))
}

/// DELETE /api/v1/workspaces/{workspace_id}/members/{user_id}
///
/// Remove a member, or leave when `user_id` is the caller.
pub async fn remove_member(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let removed = MemberRepo::remove(
        &state.pool,
        ctx.workspace_id,
        user_id,
        ctx.user_id,
        |facts: &MembershipFacts| -> AppResult<()> {
            let target = stored_role(&facts.current_role)?;
            check_member_removal(ctx.user_id, ctx.role, user_id, target, facts.owner_count)?;
            Ok(())
        },
    )
    .await?;
    if !removed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Member",
            id: user_id,
        }));
    }

    state
        .event_bus
        .publish(ctx.change(entity_types::MEMBER, user_id, actions::MEMBER_REMOVED));
    tracing::info!(
        workspace_id = ctx.workspace_id,
        member_user_id = user_id,
        user_id = ctx.user_id,
        "Member removed"
    );

    Ok(StatusCode::NO_CONTENT)
}

fn stored_role(raw: &str) -> AppResult<WorkspaceRole> {
    raw.parse::<WorkspaceRole>()
        .map_err(|_| AppError::InternalError(format!("Stored role '{raw}' is not a known role")))
}
