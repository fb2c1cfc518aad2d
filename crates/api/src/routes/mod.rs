pub mod auth;
pub mod health;
pub mod milestone;
pub mod project;
pub mod task;
pub mod workspace;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the request/response part of the `/api/v1` route tree. The
/// long-lived change stream lives in [`stream_routes`].
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
/// /auth/me                                         current user
///
/// /workspaces                                      list, create
/// /workspaces/{wid}                                get, update, delete
/// /workspaces/{wid}/dashboard                      stats
/// /workspaces/{wid}/activity                       activity log
/// /workspaces/{wid}/members                        list, add
/// /workspaces/{wid}/members/{uid}                  change role, remove
///
/// /workspaces/{wid}/projects                       list, create
/// /workspaces/{wid}/projects/{pid}                 get, update, delete
/// /workspaces/{wid}/projects/{pid}/stats           task stats
/// /workspaces/{wid}/projects/{pid}/members         list, add
/// /workspaces/{wid}/projects/{pid}/members/{uid}   remove
/// /workspaces/{wid}/projects/{pid}/milestones      list, create
/// /workspaces/{wid}/projects/{pid}/labels          list, create
/// /workspaces/{wid}/projects/{pid}/labels/{lid}    delete
/// /workspaces/{wid}/projects/{pid}/tasks           list, create
///
/// /workspaces/{wid}/milestones/{mid}               get, update, delete
///
/// /workspaces/{wid}/tasks/bulk                     bulk update (PATCH)
/// /workspaces/{wid}/tasks/{tid}                    get, update, delete
/// /workspaces/{wid}/tasks/{tid}/move               move (POST)
/// /workspaces/{wid}/tasks/{tid}/subtasks           list, create
/// /workspaces/{wid}/tasks/{tid}/toggle             toggle completion (POST)
/// /workspaces/{wid}/tasks/{tid}/time-entries       list, create, delete (?entryId=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest(
            "/workspaces",
            workspace::router()
                .merge(project::router())
                .merge(milestone::router())
                .merge(task::router()),
        )
}

/// Long-lived routes under `/api/v1`, kept out of the request timeout.
///
/// ```text
/// /workspaces/{wid}/events                         WebSocket change stream
/// ```
pub fn stream_routes() -> Router<AppState> {
    Router::new().route("/workspaces/{workspace_id}/events", get(ws::events_handler))
}
