//! Handler for the workspace activity log.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_core::activity::validate_entity_type;
use taskdeck_core::policy::Action;
use taskdeck_db::models::activity::ActivityQuery;
use taskdeck_db::repositories::ActivityRepo;

use crate::error::AppResult;
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/activity
///
/// Newest first. Filters: `entityType`, `entityId`, `userId`; paging with
/// `limit` (default 50) and `offset`. Returns `{ items, total }`.
pub async fn list_activity(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
    Query(params): Query<ActivityQuery>,
) -> AppResult<impl IntoResponse> {
    ctx.require(Action::ViewActivity)?;
    if let Some(entity_type) = &params.entity_type {
        validate_entity_type(entity_type)?;
    }

    let page = ActivityRepo::list(&state.pool, ctx.workspace_id, &params).await?;
    Ok(Json(DataResponse { data: page }))
}
