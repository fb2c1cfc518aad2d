//! Repository for the `labels` and `task_labels` tables.

use sqlx::{PgConnection, PgPool};
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::types::DbId;

use crate::models::activity::CreateActivityLog;
use crate::models::label::{CreateLabel, Label};
use crate::repositories::ActivityRepo;

const COLUMNS: &str = "id, project_id, name, color, created_at";

pub struct LabelRepo;

impl LabelRepo {
    /// Insert a label. A duplicate name in the project violates
    /// `uq_labels_project_name`.
    pub async fn create(
        pool: &PgPool,
        workspace_id: DbId,
        project_id: DbId,
        actor_id: DbId,
        input: &CreateLabel,
    ) -> Result<Label, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO labels (project_id, name, color)
             VALUES ($1, $2, COALESCE($3, '#6366F1'))
             RETURNING {COLUMNS}"
        );
        let label = sqlx::query_as::<_, Label>(&query)
            .bind(project_id)
            .bind(&input.name)
            .bind(&input.color)
            .fetch_one(&mut *tx)
            .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::LABEL, label.id, actions::CREATED)
                .by(actor_id)
                .with_changes(serde_json::json!({ "projectId": project_id, "name": label.name })),
        )
        .await?;

        tx.commit().await?;
        Ok(label)
    }

    pub async fn list_by_project(pool: &PgPool, project_id: DbId) -> Result<Vec<Label>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM labels WHERE project_id = $1 ORDER BY name");
        sqlx::query_as::<_, Label>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(
        pool: &PgPool,
        workspace_id: DbId,
        project_id: DbId,
        id: DbId,
        actor_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let name: Option<String> = sqlx::query_scalar(
            "DELETE FROM labels WHERE id = $1 AND project_id = $2 RETURNING name",
        )
        .bind(id)
        .bind(project_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(name) = name else {
            return Ok(false);
        };

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::LABEL, id, actions::DELETED)
                .by(actor_id)
                .with_changes(serde_json::json!({ "projectId": project_id, "name": name })),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// How many of `ids` are labels of `project_id`.
    pub async fn count_in_project(
        pool: &PgPool,
        project_id: DbId,
        ids: &[DbId],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM labels WHERE project_id = $1 AND id = ANY($2)")
            .bind(project_id)
            .bind(ids)
            .fetch_one(pool)
            .await
    }

    /// Labels attached to a task, by name.
    pub async fn list_for_task(pool: &PgPool, task_id: DbId) -> Result<Vec<Label>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            "SELECT l.id, l.project_id, l.name, l.color, l.created_at
             FROM labels l
             JOIN task_labels tl ON tl.label_id = l.id
             WHERE tl.task_id = $1
             ORDER BY l.name",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Label ids attached to a task, ascending.
    pub async fn ids_for_task(
        conn: &mut PgConnection,
        task_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT label_id FROM task_labels WHERE task_id = $1 ORDER BY label_id")
            .bind(task_id)
            .fetch_all(conn)
            .await
    }

    /// Replace a task's label set inside the caller's transaction. Ids that
    /// are not labels of `project_id` are skipped.
    pub async fn set_for_task(
        conn: &mut PgConnection,
        task_id: DbId,
        project_id: DbId,
        label_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_labels WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *conn)
            .await?;

        if !label_ids.is_empty() {
            sqlx::query(
                "INSERT INTO task_labels (task_id, label_id)
                 SELECT $1, id FROM labels WHERE project_id = $2 AND id = ANY($3)",
            )
            .bind(task_id)
            .bind(project_id)
            .bind(label_ids)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
