//! Task entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskdeck_core::stats::SubtaskProgress;
use taskdeck_core::types::{Date, DbId, Timestamp};

use super::deserialize_some;
use crate::models::label::Label;

/// A row from the `tasks` table.
///
/// `number` is assigned once per project and never reused; `time_spent` is
/// the sum of the task's time entry durations in minutes.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: DbId,
    pub project_id: DbId,
    pub milestone_id: Option<DbId>,
    pub parent_id: Option<DbId>,
    pub number: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub task_type: String,
    pub story_points: Option<i32>,
    pub time_spent: i32,
    pub position: i32,
    pub assignee_id: Option<DbId>,
    pub creator_id: Option<DbId>,
    pub due_date: Option<Date>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A task with its labels and subtask progress.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub labels: Vec<Label>,
    pub subtask_progress: SubtaskProgress,
}

/// Subtasks of one parent plus their completion ratio.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskList {
    pub subtasks: Vec<Task>,
    pub progress: SubtaskProgress,
}

/// DTO for creating a task (or, with `parent_id` set, a subtask).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub story_points: Option<i32>,
    pub assignee_id: Option<DbId>,
    pub milestone_id: Option<DbId>,
    pub parent_id: Option<DbId>,
    pub due_date: Option<Date>,
    #[serde(default)]
    pub label_ids: Vec<DbId>,
}

/// DTO for a partial task update. `labelIds`, when present, replaces the
/// whole label set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub story_points: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assignee_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub milestone_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<Date>>,
    pub label_ids: Option<Vec<DbId>>,
}

/// DTO for moving a task on the board.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTask {
    pub status: String,
    pub position: i32,
}

/// DTO for updating many tasks of one project at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateTasks {
    pub project_id: DbId,
    pub task_ids: Vec<DbId>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assignee_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub milestone_id: Option<Option<DbId>>,
}

impl BulkUpdateTasks {
    /// The per-task partial update this bulk request applies.
    pub fn as_update(&self) -> UpdateTask {
        UpdateTask {
            status: self.status.clone(),
            priority: self.priority.clone(),
            assignee_id: self.assignee_id,
            milestone_id: self.milestone_id,
            ..Default::default()
        }
    }

    /// `true` if the request would not change anything.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.assignee_id.is_none()
            && self.milestone_id.is_none()
    }
}

/// DTO for toggling a subtask's completion. `completed` defaults to the
/// opposite of the current state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleTask {
    pub completed: Option<bool>,
}

/// Filters for listing tasks in a project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub assignee_id: Option<DbId>,
    pub milestone_id: Option<DbId>,
    pub parent_id: Option<DbId>,
    pub label_id: Option<DbId>,
    /// Case-insensitive substring match on the title.
    pub q: Option<String>,
    /// Only tasks without a parent.
    pub top_level: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
