//! Repository for the `projects` table.

use sqlx::PgPool;
use taskdeck_core::activity::{actions, diff_changes, entity_types};
use taskdeck_core::types::DbId;

use crate::models::activity::CreateActivityLog;
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::repositories::workspace_repo::to_json;
use crate::repositories::ActivityRepo;

/// Column list shared across queries. `task_counter` stays internal.
const COLUMNS: &str = "id, workspace_id, name, key, description, status, color, created_by, \
                       created_at, updated_at";

pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a project. `input.key` must already be normalised.
    ///
    /// A key already used in the workspace violates `uq_projects_workspace_key`.
    pub async fn create(
        pool: &PgPool,
        workspace_id: DbId,
        creator_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO projects (workspace_id, name, key, description, status, color, created_by)
             VALUES ($1, $2, $3, $4, COALESCE($5, 'active'), COALESCE($6, '#6366F1'), $7)
             RETURNING {COLUMNS}"
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(workspace_id)
            .bind(&input.name)
            .bind(&input.key)
            .bind(&input.description)
            .bind(&input.status)
            .bind(&input.color)
            .bind(creator_id)
            .fetch_one(&mut *tx)
            .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::PROJECT, project.id, actions::CREATED)
                .by(creator_id)
                .with_changes(serde_json::json!({ "name": project.name, "key": project.key })),
        )
        .await?;

        tx.commit().await?;
        Ok(project)
    }

    /// Find a project by ID, scoped to its workspace.
    pub async fn find_in_workspace(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND workspace_id = $2");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(workspace_id)
            .fetch_optional(pool)
            .await
    }

    /// List a workspace's projects by name, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        workspace_id: DbId,
        status: Option<&str>,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE workspace_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY name, id"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(workspace_id)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update and record the diff. Returns `None` if no such
    /// project exists in the workspace.
    pub async fn update(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
        actor_id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!(
            "SELECT {COLUMNS} FROM projects WHERE id = $1 AND workspace_id = $2 FOR UPDATE"
        );
        let Some(before) = sqlx::query_as::<_, Project>(&select)
            .bind(id)
            .bind(workspace_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                key = COALESCE($3, key),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                status = COALESCE($6, status),
                color = COALESCE($7, color)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let after = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.key)
            .bind(input.description.is_some())
            .bind(input.description.as_ref().and_then(|d| d.as_deref()))
            .bind(&input.status)
            .bind(&input.color)
            .fetch_one(&mut *tx)
            .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::PROJECT, id, actions::UPDATED)
                .by(actor_id)
                .with_changes(diff_changes(&to_json(&before), &to_json(&after))),
        )
        .await?;

        tx.commit().await?;
        Ok(Some(after))
    }

    /// Delete a project; tasks, milestones and labels cascade.
    pub async fn delete(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
        actor_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let name: Option<String> = sqlx::query_scalar(
            "DELETE FROM projects WHERE id = $1 AND workspace_id = $2 RETURNING name",
        )
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(name) = name else {
            return Ok(false);
        };

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::PROJECT, id, actions::DELETED)
                .by(actor_id)
                .with_changes(serde_json::json!({ "name": name })),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
