//! Repository for the `project_members` table.

use sqlx::PgPool;
use taskdeck_core::types::DbId;

use crate::models::member::ProjectMember;

pub struct ProjectMemberRepo;

impl ProjectMemberRepo {
    pub async fn list(pool: &PgPool, project_id: DbId) -> Result<Vec<ProjectMember>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            "SELECT pm.project_id, pm.user_id, u.email, u.name, pm.added_at
             FROM project_members pm
             JOIN users u ON u.id = pm.user_id
             WHERE pm.project_id = $1
             ORDER BY u.name, u.id",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Add a user to a project, returning the joined row. Adding the same
    /// user twice violates `uq_project_members_project_user`.
    pub async fn add(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<ProjectMember, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            "WITH inserted AS (
                 INSERT INTO project_members (project_id, user_id)
                 VALUES ($1, $2)
                 RETURNING project_id, user_id, added_at
             )
             SELECT i.project_id, i.user_id, u.email, u.name, i.added_at
             FROM inserted i
             JOIN users u ON u.id = i.user_id",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn remove(pool: &PgPool, project_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
