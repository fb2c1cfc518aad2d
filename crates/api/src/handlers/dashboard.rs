//! Handler for the workspace dashboard.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use taskdeck_db::models::dashboard::WorkspaceDashboard;
use taskdeck_db::repositories::{DashboardRepo, MemberRepo};

use crate::error::AppResult;
use crate::middleware::workspace::WorkspaceContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/workspaces/{workspace_id}/dashboard
///
/// Workspace-wide task counts and completion, one summary per project.
/// Owners and admins also get `memberCount` and `tasksByAssignee`.
pub async fn get_dashboard(
    ctx: WorkspaceContext,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stats = DashboardRepo::workspace_stats(&state.pool, ctx.workspace_id).await?;
    let projects = DashboardRepo::project_summaries(&state.pool, ctx.workspace_id).await?;

    let (member_count, tasks_by_assignee) = if ctx.role.is_admin_like() {
        (
            Some(MemberRepo::count(&state.pool, ctx.workspace_id).await?),
            Some(DashboardRepo::tasks_by_assignee(&state.pool, ctx.workspace_id).await?),
        )
    } else {
        (None, None)
    };

    Ok(Json(DataResponse {
        data: WorkspaceDashboard {
            stats,
            projects,
            member_count,
            tasks_by_assignee,
        },
    }))
}
