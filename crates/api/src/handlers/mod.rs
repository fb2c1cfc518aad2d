//! Request handlers.
//!
//! Each submodule covers one resource. Workspace-scoped handlers take a
//! [`WorkspaceContext`], check the action they perform with
//! [`WorkspaceContext::require`], delegate to a repository in `taskdeck_db`,
//! and publish a change event after every committed mutation.

pub mod activity;
pub mod auth;
pub mod dashboard;
pub mod label;
pub mod member;
pub mod milestone;
pub mod project;
pub mod project_member;
pub mod subtask;
pub mod task;
pub mod time_entry;
pub mod workspace;

use taskdeck_core::error::CoreError;
use taskdeck_core::types::DbId;
use taskdeck_db::models::project::Project;
use taskdeck_db::models::task::Task;
use taskdeck_db::repositories::{ProjectRepo, TaskRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::workspace::WorkspaceContext;
use crate::state::AppState;

/// Load a project of the caller's workspace, or 404.
pub(crate) async fn project_in_workspace(
    state: &AppState,
    ctx: &WorkspaceContext,
    project_id: DbId,
) -> AppResult<Project> {
    ProjectRepo::find_in_workspace(&state.pool, ctx.workspace_id, project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))
}

/// Load a task of the caller's workspace, or 404.
pub(crate) async fn task_in_workspace(
    state: &AppState,
    ctx: &WorkspaceContext,
    task_id: DbId,
) -> AppResult<Task> {
    TaskRepo::find_in_workspace(&state.pool, ctx.workspace_id, task_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }))
}

/// Trim an optional free-text field, mapping blank to `None`.
pub(crate) fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
