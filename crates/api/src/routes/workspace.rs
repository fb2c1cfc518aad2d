//! Route definitions for the `/workspaces` resource itself: membership,
//! dashboard, and activity.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::{activity, dashboard, member, workspace};
use crate::state::AppState;

/// Routes mounted at `/workspaces`.
///
/// ```text
/// GET    /                                  -> list_workspaces
/// POST   /                                  -> create_workspace
/// GET    /{workspace_id}                    -> get_workspace
/// PATCH  /{workspace_id}                    -> update_workspace
/// DELETE /{workspace_id}                    -> delete_workspace
///
/// GET    /{workspace_id}/dashboard          -> get_dashboard
/// GET    /{workspace_id}/activity           -> list_activity
///
/// GET    /{workspace_id}/members            -> list_members
/// POST   /{workspace_id}/members            -> add_member
/// PATCH  /{workspace_id}/members/{user_id}  -> update_member_role
/// DELETE /{workspace_id}/members/{user_id}  -> remove_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(workspace::list_workspaces).post(workspace::create_workspace),
        )
        .route(
            "/{workspace_id}",
            get(workspace::get_workspace)
                .patch(workspace::update_workspace)
                .delete(workspace::delete_workspace),
        )
        .route("/{workspace_id}/dashboard", get(dashboard::get_dashboard))
        .route("/{workspace_id}/activity", get(activity::list_activity))
        .route(
            "/{workspace_id}/members",
            get(member::list_members).post(member::add_member),
        )
        .route(
            "/{workspace_id}/members/{user_id}",
            patch(member::update_member_role).delete(member::remove_member),
        )
}
