//! Read models for the workspace dashboard and project stats.

use serde::Serialize;
use sqlx::FromRow;
use taskdeck_core::stats::TaskStats;
use taskdeck_core::types::DbId;

/// One project's card on the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_id: DbId,
    pub name: String,
    pub key: String,
    pub color: String,
    pub status: String,
    pub stats: TaskStats,
}

/// Open/completed task counts for one assignee (`None` = unassigned).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeLoad {
    pub user_id: Option<DbId>,
    pub name: Option<String>,
    pub open_tasks: i64,
    pub completed_tasks: i64,
}

/// Workspace-wide dashboard.
///
/// `member_count` and `tasks_by_assignee` are only filled in for admin-like
/// callers and are omitted from the JSON otherwise.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDashboard {
    #[serde(flatten)]
    pub stats: TaskStats,
    pub projects: Vec<ProjectSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_by_assignee: Option<Vec<AssigneeLoad>>,
}
