//! Time entry entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskdeck_core::types::{Date, DbId, Timestamp};

/// A row from the `time_entries` table. `duration` is in minutes.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: DbId,
    pub task_id: DbId,
    pub user_id: DbId,
    pub description: Option<String>,
    pub duration: i32,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub date: Date,
    pub created_at: Timestamp,
}

/// DTO for logging time against a task. `date` defaults to today (UTC).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeEntry {
    pub description: Option<String>,
    pub duration: i32,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub date: Option<Date>,
}

/// `{ "timeEntries": [...] }` list envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryList {
    pub time_entries: Vec<TimeEntry>,
}

/// `?entryId=` on `DELETE .../time-entries`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryParams {
    pub entry_id: DbId,
}
