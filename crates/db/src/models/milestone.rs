//! Milestone entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskdeck_core::stats::TaskStats;
use taskdeck_core::types::{Date, DbId, Timestamp};

use super::deserialize_some;

/// A row from the `milestones` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub milestone_type: String,
    pub status: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub sprint_goal: Option<String>,
    pub capacity: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A milestone with its assignees and task progress.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDetail {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub assignee_ids: Vec<DbId>,
    pub progress: TaskStats,
}

/// DTO for creating a milestone.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilestone {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `milestone` if omitted.
    #[serde(rename = "type")]
    pub milestone_type: Option<String>,
    /// Defaults to `planning` if omitted.
    pub status: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub sprint_goal: Option<String>,
    pub capacity: Option<i32>,
    #[serde(default)]
    pub assignee_ids: Vec<DbId>,
}

/// DTO for updating a milestone. `assigneeIds`, when present, replaces the
/// whole assignee list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMilestone {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type")]
    pub milestone_type: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub start_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub end_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub sprint_goal: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub capacity: Option<Option<i32>>,
    pub assignee_ids: Option<Vec<DbId>>,
}
