//! Repository for the `milestones` and `milestone_assignees` tables.

use sqlx::{PgConnection, PgPool};
use taskdeck_core::activity::{actions, diff_changes, entity_types};
use taskdeck_core::types::DbId;

use crate::models::activity::CreateActivityLog;
use crate::models::milestone::{CreateMilestone, Milestone, UpdateMilestone};
use crate::repositories::workspace_repo::to_json;
use crate::repositories::ActivityRepo;

const COLUMNS: &str = "id, project_id, name, description, type, status, start_date, end_date, \
                       sprint_goal, capacity, created_at, updated_at";

pub struct MilestoneRepo;

impl MilestoneRepo {
    /// Insert a milestone with its assignees. Enum fields must already be
    /// canonical and assignees checked for workspace membership.
    pub async fn create(
        pool: &PgPool,
        workspace_id: DbId,
        project_id: DbId,
        actor_id: DbId,
        input: &CreateMilestone,
    ) -> Result<Milestone, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO milestones
                (project_id, name, description, type, status, start_date, end_date, sprint_goal, capacity)
             VALUES ($1, $2, $3, COALESCE($4, 'milestone'), COALESCE($5, 'planning'), $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let milestone = sqlx::query_as::<_, Milestone>(&query)
            .bind(project_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.milestone_type)
            .bind(&input.status)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.sprint_goal)
            .bind(input.capacity)
            .fetch_one(&mut *tx)
            .await?;

        Self::set_assignees_inner(&mut tx, milestone.id, &input.assignee_ids).await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(
                workspace_id,
                entity_types::MILESTONE,
                milestone.id,
                actions::CREATED,
            )
            .by(actor_id)
            .with_changes(serde_json::json!({
                "projectId": project_id,
                "name": milestone.name,
                "type": milestone.milestone_type,
            })),
        )
        .await?;

        tx.commit().await?;
        Ok(milestone)
    }

    /// Find a milestone whose project belongs to `workspace_id`.
    pub async fn find_in_workspace(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
    ) -> Result<Option<Milestone>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM milestones
             WHERE id = $1
               AND project_id IN (SELECT id FROM projects WHERE workspace_id = $2)"
        );
        sqlx::query_as::<_, Milestone>(&query)
            .bind(id)
            .bind(workspace_id)
            .fetch_optional(pool)
            .await
    }

    /// A project's milestones, earliest start first (undated last).
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Milestone>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM milestones
             WHERE project_id = $1
             ORDER BY start_date NULLS LAST, id"
        );
        sqlx::query_as::<_, Milestone>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn assignee_ids(pool: &PgPool, milestone_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM milestone_assignees WHERE milestone_id = $1 ORDER BY user_id",
        )
        .bind(milestone_id)
        .fetch_all(pool)
        .await
    }

    /// Apply a partial update and, when given, replace the assignee list.
    pub async fn update(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
        actor_id: DbId,
        input: &UpdateMilestone,
    ) -> Result<Option<Milestone>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!("SELECT {COLUMNS} FROM milestones WHERE id = $1 FOR UPDATE");
        let Some(before) = sqlx::query_as::<_, Milestone>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "UPDATE milestones SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                type = COALESCE($5, type),
                status = COALESCE($6, status),
                start_date = CASE WHEN $7 THEN $8 ELSE start_date END,
                end_date = CASE WHEN $9 THEN $10 ELSE end_date END,
                sprint_goal = CASE WHEN $11 THEN $12 ELSE sprint_goal END,
                capacity = CASE WHEN $13 THEN $14 ELSE capacity END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let after = sqlx::query_as::<_, Milestone>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.description.is_some())
            .bind(input.description.as_ref().and_then(|d| d.as_deref()))
            .bind(&input.milestone_type)
            .bind(&input.status)
            .bind(input.start_date.is_some())
            .bind(input.start_date.flatten())
            .bind(input.end_date.is_some())
            .bind(input.end_date.flatten())
            .bind(input.sprint_goal.is_some())
            .bind(input.sprint_goal.as_ref().and_then(|g| g.as_deref()))
            .bind(input.capacity.is_some())
            .bind(input.capacity.flatten())
            .fetch_one(&mut *tx)
            .await?;

        if let Some(assignee_ids) = &input.assignee_ids {
            Self::set_assignees_inner(&mut tx, id, assignee_ids).await?;
        }

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::MILESTONE, id, actions::UPDATED)
                .by(actor_id)
                .with_changes(diff_changes(&to_json(&before), &to_json(&after))),
        )
        .await?;

        tx.commit().await?;
        Ok(Some(after))
    }

    /// Delete a milestone. Its tasks stay, with `milestone_id` cleared.
    pub async fn delete(
        pool: &PgPool,
        workspace_id: DbId,
        id: DbId,
        actor_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let name: Option<String> =
            sqlx::query_scalar("DELETE FROM milestones WHERE id = $1 RETURNING name")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(name) = name else {
            return Ok(false);
        };

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::MILESTONE, id, actions::DELETED)
                .by(actor_id)
                .with_changes(serde_json::json!({ "name": name })),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn set_assignees_inner(
        conn: &mut PgConnection,
        milestone_id: DbId,
        user_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM milestone_assignees WHERE milestone_id = $1")
            .bind(milestone_id)
            .execute(&mut *conn)
            .await?;

        if !user_ids.is_empty() {
            sqlx::query(
                "INSERT INTO milestone_assignees (milestone_id, user_id)
                 SELECT $1, u FROM UNNEST($2::BIGINT[]) AS u
                 ON CONFLICT DO NOTHING",
            )
            .bind(milestone_id)
            .bind(user_ids)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
