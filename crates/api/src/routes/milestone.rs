//! Route definitions for individual milestones.

use axum::routing::get;
use axum::Router;

use crate::handlers::milestone;
use crate::state::AppState;

/// Routes mounted at `/workspaces`.
///
/// ```text
/// GET    /{wid}/milestones/{mid}            -> get_milestone
/// PATCH  /{wid}/milestones/{mid}            -> update_milestone
/// DELETE /{wid}/milestones/{mid}            -> delete_milestone
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{workspace_id}/milestones/{milestone_id}",
        get(milestone::get_milestone)
            .patch(milestone::update_milestone)
            .delete(milestone::delete_milestone),
    )
}
