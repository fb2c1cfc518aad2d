//! Route definitions for individual tasks, their subtasks, and time entries.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{subtask, task, time_entry};
use crate::state::AppState;

/// Routes mounted at `/workspaces`.
///
/// `/tasks/bulk` is a static segment and wins over `/tasks/{task_id}`.
///
/// ```text
/// PATCH  /{wid}/tasks/bulk                  -> bulk_update_tasks
/// GET    /{wid}/tasks/{tid}                 -> get_task
/// PATCH  /{wid}/tasks/{tid}                 -> update_task
/// DELETE /{wid}/tasks/{tid}                 -> delete_task
/// POST   /{wid}/tasks/{tid}/move            -> move_task
/// GET    /{wid}/tasks/{tid}/subtasks        -> list_subtasks
/// POST   /{wid}/tasks/{tid}/subtasks        -> create_subtask
/// POST   /{wid}/tasks/{tid}/toggle          -> toggle_task
/// GET    /{wid}/tasks/{tid}/time-entries    -> list_time_entries
/// POST   /{wid}/tasks/{tid}/time-entries    -> create_time_entry
/// DELETE /{wid}/tasks/{tid}/time-entries    -> delete_time_entry (?entryId=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{workspace_id}/tasks/bulk", patch(task::bulk_update_tasks))
        .route(
            "/{workspace_id}/tasks/{task_id}",
            get(task::get_task)
                .patch(task::update_task)
                .delete(task::delete_task),
        )
        .route("/{workspace_id}/tasks/{task_id}/move", post(task::move_task))
        .route(
            "/{workspace_id}/tasks/{task_id}/subtasks",
            get(subtask::list_subtasks).post(subtask::create_subtask),
        )
        .route("/{workspace_id}/tasks/{task_id}/toggle", post(subtask::toggle_task))
        .route(
            "/{workspace_id}/tasks/{task_id}/time-entries",
            get(time_entry::list_time_entries)
                .post(time_entry::create_time_entry)
                .delete(time_entry::delete_time_entry),
        )
}
