//! Repository for the `time_entries` table.
//!
//! `tasks.time_spent` is the sum of a task's entry durations. Every insert
//! or delete here adjusts it in the same transaction.

use sqlx::PgPool;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::types::DbId;

use crate::models::activity::CreateActivityLog;
use crate::models::time_entry::{CreateTimeEntry, TimeEntry};
use crate::repositories::ActivityRepo;

const COLUMNS: &str =
    "id, task_id, user_id, description, duration, start_time, end_time, date, created_at";

pub struct TimeEntryRepo;

impl TimeEntryRepo {
    /// Entries for a task, newest first.
    pub async fn list_by_task(pool: &PgPool, task_id: DbId) -> Result<Vec<TimeEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM time_entries
             WHERE task_id = $1
             ORDER BY date DESC, created_at DESC, id DESC"
        );
        sqlx::query_as::<_, TimeEntry>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    /// Find an entry only if it belongs to `task_id`.
    pub async fn find_for_task(
        pool: &PgPool,
        task_id: DbId,
        id: DbId,
    ) -> Result<Option<TimeEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM time_entries WHERE id = $1 AND task_id = $2");
        sqlx::query_as::<_, TimeEntry>(&query)
            .bind(id)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// Log time against a task and add it to the task's `time_spent`.
    ///
    /// `input` must already be validated (positive duration, ordered range).
    pub async fn create(
        pool: &PgPool,
        workspace_id: DbId,
        task_id: DbId,
        user_id: DbId,
        input: &CreateTimeEntry,
    ) -> Result<TimeEntry, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO time_entries (task_id, user_id, description, duration, start_time, end_time, date)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, (NOW() AT TIME ZONE 'UTC')::DATE))
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, TimeEntry>(&query)
            .bind(task_id)
            .bind(user_id)
            .bind(&input.description)
            .bind(input.duration)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.date)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE tasks SET time_spent = time_spent + $2 WHERE id = $1")
            .bind(task_id)
            .bind(entry.duration)
            .execute(&mut *tx)
            .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::TASK, task_id, actions::TIME_LOGGED)
                .by(user_id)
                .with_changes(serde_json::json!({
                    "timeEntryId": entry.id,
                    "duration": entry.duration,
                })),
        )
        .await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// Delete an entry of `task_id` and subtract it from `time_spent`.
    ///
    /// Returns `false` (and writes nothing) if the entry does not exist or
    /// belongs to another task.
    pub async fn delete(
        pool: &PgPool,
        workspace_id: DbId,
        task_id: DbId,
        id: DbId,
        actor_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let duration: Option<i32> = sqlx::query_scalar(
            "DELETE FROM time_entries WHERE id = $1 AND task_id = $2 RETURNING duration",
        )
        .bind(id)
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(duration) = duration else {
            return Ok(false);
        };

        sqlx::query("UPDATE tasks SET time_spent = GREATEST(time_spent - $2, 0) WHERE id = $1")
            .bind(task_id)
            .bind(duration)
            .execute(&mut *tx)
            .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::TASK, task_id, actions::TIME_REMOVED)
                .by(actor_id)
                .with_changes(serde_json::json!({ "timeEntryId": id, "duration": duration })),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
