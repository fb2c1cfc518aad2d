//! Task vocabularies and validation.
//!
//! There is exactly one status vocabulary for board tasks and subtasks
//! alike. Older clients sent `inProgress`, `complete`, or `completed` for
//! statuses and `urgent` for priority; those spellings are accepted on input
//! through [`TaskStatus::parse_input`] / [`TaskPriority::parse_input`] and
//! never produced on output.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::types::DbId;

define_text_enum! {
    /// Board column a task sits in. Any status may move to any other.
    TaskStatus("task status") {
        Todo = "todo",
        InProgress = "in_progress",
        InReview = "in_review",
        Done = "done",
    }
}

define_text_enum! {
    /// Display/filter-only priority. No transition rules.
    TaskPriority("task priority") {
        Low = "low",
        Medium = "medium",
        High = "high",
        Critical = "critical",
    }
}

define_text_enum! {
    /// Kind of work item.
    TaskType("task type") {
        Task = "task",
        Story = "story",
        Bug = "bug",
        Epic = "epic",
        Subtask = "subtask",
    }
}

impl TaskStatus {
    /// Parse a status, accepting legacy spellings.
    pub fn parse_input(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "inProgress" => Ok(TaskStatus::InProgress),
            "complete" | "completed" => Ok(TaskStatus::Done),
            other => other.parse(),
        }
    }

    /// Whether the task counts as completed for progress purposes.
    pub fn is_complete(self) -> bool {
        self == TaskStatus::Done
    }

    /// Status a subtask takes when its completion checkbox is toggled.
    pub fn for_completion(completed: bool) -> Self {
        if completed {
            TaskStatus::Done
        } else {
            TaskStatus::Todo
        }
    }
}

impl TaskPriority {
    /// Parse a priority, accepting `urgent` as `critical`.
    pub fn parse_input(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "urgent" => Ok(TaskPriority::Critical),
            other => other.parse(),
        }
    }
}

pub const DEFAULT_STATUS: TaskStatus = TaskStatus::Todo;
pub const DEFAULT_PRIORITY: TaskPriority = TaskPriority::Medium;
pub const DEFAULT_TYPE: TaskType = TaskType::Task;

pub const MAX_TITLE_LENGTH: usize = 500;
pub const MAX_DESCRIPTION_LENGTH: usize = 20_000;
pub const MAX_STORY_POINTS: i32 = 1000;

/// Upper bound on the number of tasks touched by one bulk update.
pub const MAX_BULK_TASKS: usize = 100;

/// Validate a task title: non-blank and within the length limit.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Task title cannot be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Task title exceeds maximum length of {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "Task description exceeds maximum length of {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_story_points(points: i32) -> Result<(), CoreError> {
    if !(0..=MAX_STORY_POINTS).contains(&points) {
        return Err(CoreError::Validation(format!(
            "Story points must be between 0 and {MAX_STORY_POINTS}"
        )));
    }
    Ok(())
}

/// Validate the id list of a bulk update and return it de-duplicated,
/// preserving first-seen order.
pub fn validate_bulk_ids(ids: &[DbId]) -> Result<Vec<DbId>, CoreError> {
    if ids.is_empty() {
        return Err(CoreError::Validation(
            "Bulk update requires at least one task id".into(),
        ));
    }
    let mut seen = HashSet::new();
    let unique: Vec<DbId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if unique.len() > MAX_BULK_TASKS {
        return Err(CoreError::Validation(format!(
            "Bulk update is limited to {MAX_BULK_TASKS} tasks"
        )));
    }
    Ok(unique)
}

/// Check that `parent` may take a new child.
///
/// The subtask tree is one level deep: a parent must itself be top-level,
/// and a task is never its own parent.
pub fn validate_parent(
    task_id: Option<DbId>,
    parent_id: DbId,
    parent_parent_id: Option<DbId>,
) -> Result<(), CoreError> {
    if task_id == Some(parent_id) {
        return Err(CoreError::Validation("A task cannot be its own parent".into()));
    }
    if parent_parent_id.is_some() {
        return Err(CoreError::Validation(
            "Subtasks cannot have subtasks of their own".into(),
        ));
    }
    Ok(())
}

/// Clamp a requested board position into `0..=others_in_column`.
///
/// `others_in_column` is the number of tasks already in the destination
/// column, excluding the task being moved.
pub fn clamp_position(requested: i32, others_in_column: i64) -> i32 {
    let max = i32::try_from(others_in_column).unwrap_or(i32::MAX);
    requested.clamp(0, max)
}
