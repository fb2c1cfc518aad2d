//! Route definitions for projects and everything scoped to one project:
//! project members, milestones, labels, and task lists.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::{label, milestone, project, project_member, task};
use crate::state::AppState;

/// Routes mounted at `/workspaces`.
///
/// ```text
/// GET    /{wid}/projects                          -> list_projects
/// POST   /{wid}/projects                          -> create_project
/// GET    /{wid}/projects/{pid}                    -> get_project
/// PATCH  /{wid}/projects/{pid}                    -> update_project
/// DELETE /{wid}/projects/{pid}                    -> delete_project
/// GET    /{wid}/projects/{pid}/stats              -> project_stats
///
/// GET    /{wid}/projects/{pid}/members            -> list_project_members
/// POST   /{wid}/projects/{pid}/members            -> add_project_member
/// DELETE /{wid}/projects/{pid}/members/{uid}      -> remove_project_member
///
/// GET    /{wid}/projects/{pid}/milestones         -> list_milestones
/// POST   /{wid}/projects/{pid}/milestones         -> create_milestone
///
/// GET    /{wid}/projects/{pid}/labels             -> list_labels
/// POST   /{wid}/projects/{pid}/labels             -> create_label
/// DELETE /{wid}/projects/{pid}/labels/{lid}       -> delete_label
///
/// GET    /{wid}/projects/{pid}/tasks              -> list_tasks
/// POST   /{wid}/projects/{pid}/tasks              -> create_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{workspace_id}/projects",
            get(project::list_projects).post(project::create_project),
        )
        .route(
            "/{workspace_id}/projects/{project_id}",
            get(project::get_project)
                .patch(project::update_project)
                .delete(project::delete_project),
        )
        .route(
            "/{workspace_id}/projects/{project_id}/stats",
            get(project::project_stats),
        )
        .route(
            "/{workspace_id}/projects/{project_id}/members",
            get(project_member::list_project_members).post(project_member::add_project_member),
        )
        .route(
            "/{workspace_id}/projects/{project_id}/members/{user_id}",
            delete(project_member::remove_project_member),
        )
        .route(
            "/{workspace_id}/projects/{project_id}/milestones",
            get(milestone::list_milestones).post(milestone::create_milestone),
        )
        .route(
            "/{workspace_id}/projects/{project_id}/labels",
            get(label::list_labels).post(label::create_label),
        )
        .route(
            "/{workspace_id}/projects/{project_id}/labels/{label_id}",
            delete(label::delete_label),
        )
        .route(
            "/{workspace_id}/projects/{project_id}/tasks",
            get(task::list_tasks).post(task::create_task),
        )
}
