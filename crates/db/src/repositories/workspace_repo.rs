//! Repository for the `workspaces` table.

use sqlx::PgPool;
use taskdeck_core::activity::{actions, diff_changes, entity_types};
use taskdeck_core::roles::WorkspaceRole;
use taskdeck_core::types::DbId;

use crate::models::activity::CreateActivityLog;
use crate::models::workspace::{UpdateWorkspace, Workspace, WorkspaceWithRole};
use crate::repositories::ActivityRepo;

const COLUMNS: &str = "id, name, slug, description, created_by, created_at, updated_at";

/// Same columns qualified with the `w` alias, for membership joins.
const W_COLUMNS: &str =
    "w.id, w.name, w.slug, w.description, w.created_by, w.created_at, w.updated_at";

pub struct WorkspaceRepo;

impl WorkspaceRepo {
    /// Create a workspace and make `owner_id` its first owner, atomically.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Workspace, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO workspaces (name, slug, description, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let workspace = sqlx::query_as::<_, Workspace>(&query)
            .bind(name)
            .bind(slug)
            .bind(description)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role) VALUES ($1, $2, $3)",
        )
        .bind(workspace.id)
        .bind(owner_id)
        .bind(WorkspaceRole::Owner.as_str())
        .execute(&mut *tx)
        .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(
                workspace.id,
                entity_types::WORKSPACE,
                workspace.id,
                actions::CREATED,
            )
            .by(owner_id)
            .with_changes(serde_json::json!({ "name": workspace.name, "slug": workspace.slug })),
        )
        .await?;

        tx.commit().await?;
        Ok(workspace)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Workspace>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workspaces WHERE id = $1");
        sqlx::query_as::<_, Workspace>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The workspace plus `user_id`'s role, or `None` if the workspace does
    /// not exist or the user is not a member.
    pub async fn find_with_role(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<WorkspaceWithRole>, sqlx::Error> {
        let query = format!(
            "SELECT {W_COLUMNS}, m.role AS user_role
             FROM workspaces w
             JOIN workspace_members m ON m.workspace_id = w.id
             WHERE w.id = $1 AND m.user_id = $2"
        );
        sqlx::query_as::<_, WorkspaceWithRole>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Every workspace `user_id` belongs to, alphabetically.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<WorkspaceWithRole>, sqlx::Error> {
        let query = format!(
            "SELECT {W_COLUMNS}, m.role AS user_role
             FROM workspaces w
             JOIN workspace_members m ON m.workspace_id = w.id
             WHERE m.user_id = $1
             ORDER BY w.name, w.id"
        );
        sqlx::query_as::<_, WorkspaceWithRole>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update and record the diff. Returns `None` if the
    /// workspace does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        actor_id: DbId,
        input: &UpdateWorkspace,
    ) -> Result<Option<Workspace>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!("SELECT {COLUMNS} FROM workspaces WHERE id = $1 FOR UPDATE");
        let Some(before) = sqlx::query_as::<_, Workspace>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "UPDATE workspaces SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = CASE WHEN $4 THEN $5 ELSE description END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let after = sqlx::query_as::<_, Workspace>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(input.description.is_some())
            .bind(input.description.as_ref().and_then(|d| d.as_deref()))
            .fetch_one(&mut *tx)
            .await?;

        let changes = diff_changes(&to_json(&before), &to_json(&after));
        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(id, entity_types::WORKSPACE, id, actions::UPDATED)
                .by(actor_id)
                .with_changes(changes),
        )
        .await?;

        tx.commit().await?;
        Ok(Some(after))
    }

    /// Delete a workspace and, by cascade, everything in it.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Serialize a row for diffing. Rows are plain structs, so this cannot
/// fail in practice; a failure degrades to an empty diff.
pub(crate) fn to_json<T: serde::Serialize>(row: &T) -> serde_json::Value {
    serde_json::to_value(row).unwrap_or_default()
}
