//! Repository for the `tasks` table.
//!
//! A board column is the set of tasks sharing `(project_id, status,
//! parent_id)`. Positions inside a column are kept dense (`0..n`): inserts
//! append, moves shift the destination, and anything leaving a column
//! closes the gap behind it.

use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use taskdeck_core::activity::{actions, diff_changes, entity_types};
use taskdeck_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use taskdeck_core::stats::{SubtaskProgress, TaskStats};
use taskdeck_core::task::{clamp_position, TaskStatus, DEFAULT_STATUS};
use taskdeck_core::types::DbId;

use crate::models::activity::CreateActivityLog;
use crate::models::task::{CreateTask, Task, TaskFilter, UpdateTask};
use crate::repositories::workspace_repo::to_json;
use crate::repositories::{ActivityRepo, LabelRepo};

const COLUMNS: &str = "id, project_id, milestone_id, parent_id, number, title, description, \
                       status, priority, type, story_points, time_spent, position, assignee_id, \
                       creator_id, due_date, created_at, updated_at";

/// Tasks in the same board column. `$1` project, `$2` status, `$3` parent.
const SAME_COLUMN: &str =
    "project_id = $1 AND status = $2 AND parent_id IS NOT DISTINCT FROM $3";

/// Board column order, then position, then creation order.
const BOARD_ORDER: &str = "CASE status \
         WHEN 'todo' THEN 0 WHEN 'in_progress' THEN 1 WHEN 'in_review' THEN 2 ELSE 3 \
     END, position, number";

pub struct TaskRepo;

impl TaskRepo {
    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a task by ID, but only if its project belongs to `workspace_id`.
    pub async fn find_in_workspace(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks
             WHERE id = $1
               AND project_id IN (SELECT id FROM projects WHERE workspace_id = $2)"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(workspace_id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's tasks in board order. Enum filters must already be
    /// in canonical form.
    pub async fn list(
        pool: &PgPool,
        project_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let limit = clamp_limit(filter.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        let offset = clamp_offset(filter.offset);
        let pattern = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)));

        let query = format!(
            "SELECT {COLUMNS} FROM tasks
             WHERE project_id = $1
               AND ($2::TEXT IS NULL OR status = $2)
               AND ($3::TEXT IS NULL OR priority = $3)
               AND ($4::TEXT IS NULL OR type = $4)
               AND ($5::BIGINT IS NULL OR assignee_id = $5)
               AND ($6::BIGINT IS NULL OR milestone_id = $6)
               AND ($7::BIGINT IS NULL OR parent_id = $7)
               AND ($8::BIGINT IS NULL OR id IN (SELECT task_id FROM task_labels WHERE label_id = $8))
               AND ($9::TEXT IS NULL OR title ILIKE $9)
               AND (NOT $10 OR parent_id IS NULL)
             ORDER BY {BOARD_ORDER}
             LIMIT $11 OFFSET $12"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(filter.status.as_deref())
            .bind(filter.priority.as_deref())
            .bind(filter.task_type.as_deref())
            .bind(filter.assignee_id)
            .bind(filter.milestone_id)
            .bind(filter.parent_id)
            .bind(filter.label_id)
            .bind(pattern)
            .bind(filter.top_level.unwrap_or(false))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Direct children of `parent_id` in board order.
    pub async fn list_subtasks(pool: &PgPool, parent_id: DbId) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE parent_id = $1 ORDER BY {BOARD_ORDER}");
        sqlx::query_as::<_, Task>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    /// Completion of `parent_id`'s children, from a fresh count.
    pub async fn subtask_progress(
        pool: &PgPool,
        parent_id: DbId,
    ) -> Result<SubtaskProgress, sqlx::Error> {
        let (completed, total): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE status = $2), COUNT(*)
             FROM tasks WHERE parent_id = $1",
        )
        .bind(parent_id)
        .bind(TaskStatus::Done.as_str())
        .fetch_one(pool)
        .await?;
        Ok(SubtaskProgress::new(completed, total))
    }

    /// Status breakdown of every task in a project, subtasks included.
    pub async fn stats_for_project(pool: &PgPool, project_id: DbId) -> Result<TaskStats, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM tasks WHERE project_id = $1 GROUP BY status",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;
        Ok(stats_from_rows(rows))
    }

    pub async fn stats_for_milestone(
        pool: &PgPool,
        milestone_id: DbId,
    ) -> Result<TaskStats, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM tasks WHERE milestone_id = $1 GROUP BY status",
        )
        .bind(milestone_id)
        .fetch_all(pool)
        .await?;
        Ok(stats_from_rows(rows))
    }

    /// The ids in `ids` that are not tasks of `project_id`, in input order.
    pub async fn missing_from_project(
        pool: &PgPool,
        project_id: DbId,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT u.id FROM UNNEST($2::BIGINT[]) WITH ORDINALITY AS u(id, ord)
             WHERE NOT EXISTS (SELECT 1 FROM tasks t WHERE t.id = u.id AND t.project_id = $1)
             ORDER BY u.ord",
        )
        .bind(project_id)
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create a task, assigning the project's next number and appending it
    /// to its column. Enum fields must already be canonical; the parent,
    /// milestone and assignee must already be checked against the project.
    pub async fn create(
        pool: &PgPool,
        workspace_id: DbId,
        project_id: DbId,
        creator_id: DbId,
        input: &CreateTask,
    ) -> Result<Task, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Takes the same project row lock as every other position write.
        let number: i32 = sqlx::query_scalar(
            "UPDATE projects SET task_counter = task_counter + 1 WHERE id = $1
             RETURNING task_counter",
        )
        .bind(project_id)
        .fetch_one(&mut *tx)
        .await?;

        let status = input.status.as_deref().unwrap_or(DEFAULT_STATUS.as_str());
        let position =
            to_position(Self::column_len(&mut tx, project_id, status, input.parent_id, None).await?);

        let query = format!(
            "INSERT INTO tasks
                (project_id, milestone_id, parent_id, number, title, description, status,
                 priority, type, story_points, position, assignee_id, creator_id, due_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 'medium'), COALESCE($9, 'task'),
                     $10, $11, $12, $13, $14)
             RETURNING {COLUMNS}"
        );
        let task = sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(input.milestone_id)
            .bind(input.parent_id)
            .bind(number)
            .bind(&input.title)
            .bind(&input.description)
            .bind(status)
            .bind(&input.priority)
            .bind(&input.task_type)
            .bind(input.story_points)
            .bind(position)
            .bind(input.assignee_id)
            .bind(creator_id)
            .bind(input.due_date)
            .fetch_one(&mut *tx)
            .await?;

        if !input.label_ids.is_empty() {
            LabelRepo::set_for_task(&mut tx, task.id, project_id, &input.label_ids).await?;
        }

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::TASK, task.id, actions::CREATED)
                .by(creator_id)
                .with_changes(serde_json::json!({
                    "projectId": project_id,
                    "number": task.number,
                    "title": task.title,
                    "parentId": task.parent_id,
                })),
        )
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    /// Apply a partial update, optionally replacing the label set, and
    /// record a field-level diff. Returns `None` if the task does not exist.
    pub async fn update(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
        actor_id: DbId,
        input: &UpdateTask,
    ) -> Result<Option<Task>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(before) = Self::lock_with_project(&mut tx, id).await? else {
            return Ok(None);
        };
        let after = Self::update_inner(&mut tx, &before, input).await?;
        let mut changes = diff_changes(&to_json(&before), &to_json(&after));

        if let Some(label_ids) = &input.label_ids {
            let old = LabelRepo::ids_for_task(&mut tx, id).await?;
            LabelRepo::set_for_task(&mut tx, id, before.project_id, label_ids).await?;
            let new = LabelRepo::ids_for_task(&mut tx, id).await?;
            if old != new {
                if let Value::Object(map) = &mut changes {
                    map.insert("labelIds".into(), serde_json::json!({ "from": old, "to": new }));
                }
            }
        }

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::TASK, id, actions::UPDATED)
                .by(actor_id)
                .with_changes(changes),
        )
        .await?;

        tx.commit().await?;
        Ok(Some(after))
    }

    /// Move a task to `status` at `requested` position (clamped into the
    /// column). Returns `None` if the task does not exist.
    pub async fn move_task(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
        actor_id: DbId,
        status: &str,
        requested: i32,
    ) -> Result<Option<Task>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(before) = Self::lock_with_project(&mut tx, id).await? else {
            return Ok(None);
        };

        Self::close_gap(&mut tx, &before).await?;
        let others =
            Self::column_len(&mut tx, before.project_id, status, before.parent_id, Some(id)).await?;
        let position = clamp_position(requested, others);

        let shift = format!(
            "UPDATE tasks SET position = position + 1
             WHERE {SAME_COLUMN} AND position >= $4 AND id <> $5"
        );
        sqlx::query(&shift)
            .bind(before.project_id)
            .bind(status)
            .bind(before.parent_id)
            .bind(position)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "UPDATE tasks SET status = $2, position = $3 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let after = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(status)
            .bind(position)
            .fetch_one(&mut *tx)
            .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::TASK, id, actions::MOVED)
                .by(actor_id)
                .with_changes(diff_changes(&to_json(&before), &to_json(&after))),
        )
        .await?;

        tx.commit().await?;
        Ok(Some(after))
    }

    /// Apply the same partial update to every task in `ids`.
    ///
    /// All ids must belong to `project_id`; if any does not, nothing is
    /// written and `None` is returned. One activity row per task.
    pub async fn bulk_update(
        pool: &PgPool,
        workspace_id: DbId,
        project_id: DbId,
        ids: &[DbId],
        actor_id: DbId,
        input: &UpdateTask,
    ) -> Result<Option<Vec<Task>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        Self::lock_project(&mut tx, project_id).await?;
        let found: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE project_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE",
        )
        .bind(project_id)
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;
        if found.len() != ids.len() {
            return Ok(None);
        }

        let mut updated = Vec::with_capacity(ids.len());
        for &id in ids {
            // Re-read each row: earlier iterations may have shifted positions.
            let Some(before) = Self::lock(&mut tx, id).await? else {
                return Ok(None);
            };
            let after = Self::update_inner(&mut tx, &before, input).await?;
            ActivityRepo::append(
                &mut tx,
                &CreateActivityLog::new(workspace_id, entity_types::TASK, id, actions::UPDATED)
                    .by(actor_id)
                    .with_changes(diff_changes(&to_json(&before), &to_json(&after))),
            )
            .await?;
            updated.push(after);
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Delete a task; subtasks, time entries and label links cascade.
    pub async fn delete(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
        actor_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if Self::lock_with_project(&mut tx, id).await?.is_none() {
            return Ok(false);
        }
        let query = format!("DELETE FROM tasks WHERE id = $1 RETURNING {COLUMNS}");
        let Some(deleted) = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(false);
        };
        Self::close_gap(&mut tx, &deleted).await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::TASK, id, actions::DELETED)
                .by(actor_id)
                .with_changes(serde_json::json!({
                    "projectId": deleted.project_id,
                    "number": deleted.number,
                    "title": deleted.title,
                })),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // In-transaction helpers
    // -----------------------------------------------------------------------

    /// Lock the project row. Every write that renumbers positions takes
    /// this lock first, so position rewrites within a project never
    /// interleave.
    async fn lock_project(conn: &mut PgConnection, project_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(project_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Lock the task's project, then the task itself.
    async fn lock_with_project(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let project_id: Option<DbId> =
            sqlx::query_scalar("SELECT project_id FROM tasks WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        let Some(project_id) = project_id else {
            return Ok(None);
        };
        Self::lock_project(&mut *conn, project_id).await?;
        Self::lock(conn, id).await
    }

    async fn lock(conn: &mut PgConnection, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Number of tasks in a column, optionally not counting `exclude`.
    async fn column_len(
        conn: &mut PgConnection,
        project_id: DbId,
        status: &str,
        parent_id: Option<DbId>,
        exclude: Option<DbId>,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM tasks
             WHERE {SAME_COLUMN} AND ($4::BIGINT IS NULL OR id <> $4)"
        );
        sqlx::query_scalar(&query)
            .bind(project_id)
            .bind(status)
            .bind(parent_id)
            .bind(exclude)
            .fetch_one(conn)
            .await
    }

    /// Pull up every task that sat below `task` in its current column.
    async fn close_gap(conn: &mut PgConnection, task: &Task) -> Result<(), sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET position = position - 1
             WHERE {SAME_COLUMN} AND position > $4 AND id <> $5"
        );
        sqlx::query(&query)
            .bind(task.project_id)
            .bind(&task.status)
            .bind(task.parent_id)
            .bind(task.position)
            .bind(task.id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Write the scalar fields of `input` over `before`. A status change
    /// moves the task to the end of its new column.
    async fn update_inner(
        conn: &mut PgConnection,
        before: &Task,
        input: &UpdateTask,
    ) -> Result<Task, sqlx::Error> {
        let new_status = input.status.as_deref().filter(|s| *s != before.status);
        let position = match new_status {
            Some(status) => {
                Self::close_gap(&mut *conn, before).await?;
                let len = Self::column_len(
                    &mut *conn,
                    before.project_id,
                    status,
                    before.parent_id,
                    Some(before.id),
                )
                .await?;
                to_position(len)
            }
            None => before.position,
        };

        let query = format!(
            "UPDATE tasks SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                status = COALESCE($5, status),
                priority = COALESCE($6, priority),
                type = COALESCE($7, type),
                story_points = CASE WHEN $8 THEN $9 ELSE story_points END,
                assignee_id = CASE WHEN $10 THEN $11 ELSE assignee_id END,
                milestone_id = CASE WHEN $12 THEN $13 ELSE milestone_id END,
                due_date = CASE WHEN $14 THEN $15 ELSE due_date END,
                position = $16
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(before.id)
            .bind(&input.title)
            .bind(input.description.is_some())
            .bind(input.description.as_ref().and_then(|d| d.as_deref()))
            .bind(&input.status)
            .bind(&input.priority)
            .bind(&input.task_type)
            .bind(input.story_points.is_some())
            .bind(input.story_points.flatten())
            .bind(input.assignee_id.is_some())
            .bind(input.assignee_id.flatten())
            .bind(input.milestone_id.is_some())
            .bind(input.milestone_id.flatten())
            .bind(input.due_date.is_some())
            .bind(input.due_date.flatten())
            .bind(position)
            .fetch_one(conn)
            .await
    }
}

/// Fold `(status, count)` rows into [`TaskStats`]. Unknown statuses cannot
/// occur (CHECK constraint) and are skipped.
pub(crate) fn stats_from_rows(rows: Vec<(String, i64)>) -> TaskStats {
    TaskStats::from_counts(
        rows.into_iter()
            .filter_map(|(status, count)| status.parse::<TaskStatus>().ok().map(|s| (s, count))),
    )
}

fn to_position(column_len: i64) -> i32 {
    i32::try_from(column_len).unwrap_or(i32::MAX)
}

/// Escape `LIKE` wildcards so user text matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("login"), "login");
    }

    #[test]
    fn stats_rows_fold_by_status() {
        let stats = stats_from_rows(vec![
            ("done".into(), 1),
            ("in_progress".into(), 1),
            ("todo".into(), 2),
        ]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.completion_percent, 25);
    }
}
