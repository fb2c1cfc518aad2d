//! Handlers for task time entries.
//!
//! Creating or deleting an entry adjusts the task's `timeSpent` in the same
//! transaction, so the running total always equals the sum of its entries.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::Action;
use taskdeck_core::time_tracking::{validate_duration, validate_entry_description, validate_time_range};
use taskdeck_core::types::DbId;
use taskdeck_db::models::time_entry::{CreateTimeEntry, TimeEntryList, TimeEntryParams};
use taskdeck_db::repositories::TimeEntryRepo;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::{task_in_workspace, trim_optional};
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/tasks/{task_id}/time-entries
///
/// Newest first, as `{ "timeEntries": [...] }`.
pub async fn list_time_entries(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    task_in_workspace(&state, &ctx, task_id).await?;
    let time_entries = TimeEntryRepo::list_by_task(&state.pool, task_id).await?;
    Ok(Json(TimeEntryList { time_entries }))
}

/// POST /api/v1/workspaces/{workspace_id}/tasks/{task_id}/time-entries
///
/// Log time against the task as the caller. `date` defaults to today (UTC).
pub async fn create_time_entry(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
    AppJson(mut input): AppJson<CreateTimeEntry>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::LogTime)?;
    task_in_workspace(&state, &ctx, task_id).await?;

    validate_duration(input.duration)?;
    validate_time_range(input.start_time, input.end_time)?;
    input.description = trim_optional(input.description);
    if let Some(description) = &input.description {
        validate_entry_description(description)?;
    }

    let entry =
        TimeEntryRepo::create(&state.pool, ctx.workspace_id, task_id, ctx.user_id, &input).await?;

    state.event_bus.publish(
        ctx.change(entity_types::TASK, task_id, actions::TIME_LOGGED)
            .with_payload(serde_json::json!({
                "timeEntryId": entry.id,
                "duration": entry.duration,
            })),
    );
    tracing::info!(
        task_id,
        time_entry_id = entry.id,
        duration = entry.duration,
        user_id = ctx.user_id,
        "Time logged"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/workspaces/{workspace_id}/tasks/{task_id}/time-entries?entryId=
///
/// Members may delete their own entries; deleting someone else's needs an
/// admin. An entry of a different task is reported as not found.
pub async fn delete_time_entry(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Path((_workspace_id, task_id)): Path<(DbId, DbId)>,
    Query(params): Query<TimeEntryParams>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::LogTime)?;
    task_in_workspace(&state, &ctx, task_id).await?;

    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "TimeEntry",
            id: params.entry_id,
        })
    };

    let entry = TimeEntryRepo::find_for_task(&state.pool, task_id, params.entry_id)
        .await?
        .ok_or_else(not_found)?;
    if entry.user_id != ctx.user_id {
        ctx.require(Action::DeleteOthersTimeEntry)?;
    }

    let deleted =
        TimeEntryRepo::delete(&state.pool, ctx.workspace_id, task_id, entry.id, ctx.user_id)
            .await?;
    if !deleted {
        return Err(not_found());
    }

    state.event_bus.publish(
        ctx.change(entity_types::TASK, task_id, actions::TIME_REMOVED)
            .with_payload(serde_json::json!({
                "timeEntryId": entry.id,
                "duration": entry.duration,
            })),
    );
    tracing::info!(task_id, time_entry_id = entry.id, user_id = ctx.user_id, "Time entry deleted");

    Ok(StatusCode::NO_CONTENT)
}
