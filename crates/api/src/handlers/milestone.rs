//! Handlers for milestones (sprints, milestones, releases).

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::error::CoreError;
use taskdeck_core::milestone::{
    validate_capacity, validate_date_range, validate_milestone_name, validate_sprint_goal,
    MilestoneStatus, MilestoneType,
};
use taskdeck_core::policy::Action;
use taskdeck_core::types::DbId;
use taskdeck_db::models::milestone::{CreateMilestone, Milestone, MilestoneDetail, UpdateMilestone};
use taskdeck_db::repositories::{MemberRepo, MilestoneRepo, TaskRepo};

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::{project_in_workspace, trim_optional};
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/projects/{project_id}/milestones
pub async fn list_milestones(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    project_in_workspace(&state, &ctx, project_id).await?;
    let milestones = MilestoneRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: milestones }))
}

/// POST /api/v1/workspaces/{workspace_id}/projects/{project_id}/milestones
pub async fn create_milestone(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, project_id)): Path<(DbId, DbId)>,
    AppJson(mut input): AppJson<CreateMilestone>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageMilestones)?;
    project_in_workspace(&state, &ctx, project_id).await?;

    validate_milestone_name(&input.name)?;
    input.name = input.name.trim().to_string();
    input.description = trim_optional(input.description);
    if let Some(kind) = &input.milestone_type {
        kind.parse::<MilestoneType>()?;
    }
    if let Some(status) = &input.status {
        status.parse::<MilestoneStatus>()?;
    }
    validate_date_range(input.start_date, input.end_date)?;
    if let Some(capacity) = input.capacity {
        validate_capacity(capacity)?;
    }
    if let Some(goal) = &input.sprint_goal {
        validate_sprint_goal(goal)?;
    }
    input.assignee_ids = checked_assignees(&state, &ctx, &input.assignee_ids).await?;

    let milestone =
        MilestoneRepo::create(&state.pool, ctx.workspace_id, project_id, ctx.user_id, &input)
            .await?;

    state
        .event_bus
        .publish(ctx.change(entity_types::MILESTONE, milestone.id, actions::CREATED));
    tracing::info!(milestone_id = milestone.id, project_id, user_id = ctx.user_id, "Milestone created");

    let detail = load_detail(&state, milestone).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/workspaces/{workspace_id}/milestones/{milestone_id}
///
/// The milestone with its assignees and the status breakdown of its tasks.
pub async fn get_milestone(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, milestone_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let milestone = milestone_in_workspace(&state, &ctx, milestone_id).await?;
    let detail = load_detail(&state, milestone).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PATCH /api/v1/workspaces/{workspace_id}/milestones/{milestone_id}
pub async fn update_milestone(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, milestone_id)): Path<(DbId, DbId)>,
    AppJson(mut input): AppJson<UpdateMilestone>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageMilestones)?;
    let existing = milestone_in_workspace(&state, &ctx, milestone_id).await?;

    if let Some(name) = &input.name {
        validate_milestone_name(name)?;
        input.name = Some(name.trim().to_string());
    }
    if let Some(description) = input.description.take() {
        input.description = Some(trim_optional(description));
    }
    if let Some(kind) = &input.milestone_type {
        kind.parse::<MilestoneType>()?;
    }
    if let Some(status) = &input.status {
        status.parse::<MilestoneStatus>()?;
    }
    // The range is checked as it will be after the update.
    validate_date_range(
        input.start_date.unwrap_or(existing.start_date),
        input.end_date.unwrap_or(existing.end_date),
    )?;
    if let Some(Some(capacity)) = input.capacity {
        validate_capacity(capacity)?;
    }
    if let Some(Some(goal)) = &input.sprint_goal {
        validate_sprint_goal(goal)?;
    }
    if let Some(ids) = &input.assignee_ids {
        input.assignee_ids = Some(checked_assignees(&state, &ctx, ids).await?);
    }

    let milestone =
        MilestoneRepo::update(&state.pool, ctx.workspace_id, milestone_id, ctx.user_id, &input)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Milestone",
                id: milestone_id,
            }))?;

    state
        .event_bus
        .publish(ctx.change(entity_types::MILESTONE, milestone_id, actions::UPDATED));
    tracing::info!(milestone_id, user_id = ctx.user_id, "Milestone updated");

    let detail = load_detail(&state, milestone).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// DELETE /api/v1/workspaces/{workspace_id}/milestones/{milestone_id}
///
/// Tasks of the milestone are kept and become unscheduled.
pub async fn delete_milestone(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, milestone_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ManageMilestones)?;
    milestone_in_workspace(&state, &ctx, milestone_id).await?;

    let deleted =
        MilestoneRepo::delete(&state.pool, ctx.workspace_id, milestone_id, ctx.user_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Milestone",
            id: milestone_id,
        }));
    }

    state
        .event_bus
        .publish(ctx.change(entity_types::MILESTONE, milestone_id, actions::DELETED));
    tracing::info!(milestone_id, user_id = ctx.user_id, "Milestone deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn milestone_in_workspace(
    state: &AppState,
    ctx: &WorkspaceContext,
    milestone_id: DbId,
) -> AppResult<Milestone> {
    MilestoneRepo::find_in_workspace(&state.pool, ctx.workspace_id, milestone_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Milestone",
            id: milestone_id,
        }))
}

async fn load_detail(state: &AppState, milestone: Milestone) -> AppResult<MilestoneDetail> {
    let assignee_ids = MilestoneRepo::assignee_ids(&state.pool, milestone.id).await?;
    let progress = TaskRepo::stats_for_milestone(&state.pool, milestone.id).await?;
    Ok(MilestoneDetail {
        milestone,
        assignee_ids,
        progress,
    })
}

/// De-duplicate assignee ids and require each to be a workspace member.
async fn checked_assignees(
    state: &AppState,
    ctx: &WorkspaceContext,
    ids: &[DbId],
) -> AppResult<Vec<DbId>> {
    let mut seen = HashSet::new();
    let unique: Vec<DbId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if unique.is_empty() {
        return Ok(unique);
    }

    let members = MemberRepo::count_members_among(&state.pool, ctx.workspace_id, &unique).await?;
    if members != unique.len() as i64 {
        return Err(AppError::Core(CoreError::Validation(
            "Every milestone assignee must be a member of the workspace".into(),
        )));
    }
    Ok(unique)
}
