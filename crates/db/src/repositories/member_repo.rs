//! Repository for the `workspace_members` table.

use sqlx::{PgConnection, PgPool};
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::roles::WorkspaceRole;
use taskdeck_core::types::DbId;

use crate::models::activity::CreateActivityLog;
use crate::models::member::{MemberWithUser, WorkspaceMember};
use crate::repositories::ActivityRepo;

const COLUMNS: &str = "id, workspace_id, user_id, role, joined_at";

/// Membership facts read inside a role-change or removal transaction,
/// after the workspace row is locked.
#[derive(Debug, Clone)]
pub struct MembershipFacts {
    /// Stored role of the target member.
    pub current_role: String,
    pub owner_count: i64,
}

pub struct MemberRepo;

impl MemberRepo {
    /// Members of a workspace with their profile, highest role first.
    pub async fn list(pool: &PgPool, workspace_id: DbId) -> Result<Vec<MemberWithUser>, sqlx::Error> {
        sqlx::query_as::<_, MemberWithUser>(
            "SELECT m.user_id, u.email, u.name, m.role, m.joined_at
             FROM workspace_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.workspace_id = $1
             ORDER BY CASE m.role
                 WHEN 'owner' THEN 0 WHEN 'admin' THEN 1 WHEN 'member' THEN 2 ELSE 3
             END, u.name, u.id",
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find(
        pool: &PgPool,
        workspace_id: DbId,
        user_id: DbId,
    ) -> Result<Option<WorkspaceMember>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workspace_members WHERE workspace_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, WorkspaceMember>(&query)
            .bind(workspace_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// The member's role text, or `None` for non-members.
    pub async fn find_role(
        pool: &PgPool,
        workspace_id: DbId,
        user_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT role FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn owner_count(pool: &PgPool, workspace_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM workspace_members WHERE workspace_id = $1 AND role = $2",
        )
        .bind(workspace_id)
        .bind(WorkspaceRole::Owner.as_str())
        .fetch_one(pool)
        .await
    }

    pub async fn count(pool: &PgPool, workspace_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM workspace_members WHERE workspace_id = $1")
            .bind(workspace_id)
            .fetch_one(pool)
            .await
    }

    /// How many of `user_ids` are members of the workspace. Callers compare
    /// against the de-duplicated input length.
    pub async fn count_members_among(
        pool: &PgPool,
        workspace_id: DbId,
        user_ids: &[DbId],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT user_id) FROM workspace_members
             WHERE workspace_id = $1 AND user_id = ANY($2)",
        )
        .bind(workspace_id)
        .bind(user_ids)
        .fetch_one(pool)
        .await
    }

    /// Add a user to the workspace. A second membership for the same user
    /// violates `uq_workspace_members_workspace_user`.
    pub async fn add(
        pool: &PgPool,
        workspace_id: DbId,
        user_id: DbId,
        role: WorkspaceRole,
        actor_id: DbId,
    ) -> Result<WorkspaceMember, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO workspace_members (workspace_id, user_id, role)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let member = sqlx::query_as::<_, WorkspaceMember>(&query)
            .bind(workspace_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_one(&mut *tx)
            .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::MEMBER, user_id, actions::MEMBER_ADDED)
                .by(actor_id)
                .with_changes(serde_json::json!({ "role": role.as_str() })),
        )
        .await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Lock the workspace row and read the target's role and the owner
    /// count. Every role change and removal in a workspace takes this lock
    /// first, so the owner count cannot change until the transaction ends.
    async fn lock_facts(
        conn: &mut PgConnection,
        workspace_id: DbId,
        user_id: DbId,
    ) -> Result<Option<MembershipFacts>, sqlx::Error> {
        sqlx::query("SELECT id FROM workspaces WHERE id = $1 FOR UPDATE")
            .bind(workspace_id)
            .execute(&mut *conn)
            .await?;

        let current_role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(current_role) = current_role else {
            return Ok(None);
        };

        let owner_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workspace_members WHERE workspace_id = $1 AND role = $2",
        )
        .bind(workspace_id)
        .bind(WorkspaceRole::Owner.as_str())
        .fetch_one(&mut *conn)
        .await?;

        Ok(Some(MembershipFacts {
            current_role,
            owner_count,
        }))
    }

    /// Change a member's role.
    ///
    /// `check` runs inside the transaction on facts read under the workspace
    /// lock; an error from it aborts the change. Returns the updated member
    /// and the previous role, or `None` if the user is not a member.
    pub async fn update_role<E, F>(
        pool: &PgPool,
        workspace_id: DbId,
        user_id: DbId,
        role: WorkspaceRole,
        actor_id: DbId,
        check: F,
    ) -> Result<Option<(WorkspaceMember, String)>, E>
    where
        E: From<sqlx::Error>,
        F: FnOnce(&MembershipFacts) -> Result<(), E>,
    {
        let mut tx = pool.begin().await?;

        let Some(facts) = Self::lock_facts(&mut tx, workspace_id, user_id).await? else {
            return Ok(None);
        };
        check(&facts)?;

        let query = format!(
            "UPDATE workspace_members SET role = $3
             WHERE workspace_id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        let member = sqlx::query_as::<_, WorkspaceMember>(&query)
            .bind(workspace_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_one(&mut *tx)
            .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(workspace_id, entity_types::MEMBER, user_id, actions::ROLE_CHANGED)
                .by(actor_id)
                .with_changes(serde_json::json!({
                    "role": { "from": facts.current_role, "to": role.as_str() }
                })),
        )
        .await?;

        tx.commit().await?;
        Ok(Some((member, facts.current_role)))
    }

    /// Remove a member. Their project memberships in this workspace go too.
    ///
    /// `check` runs under the workspace lock as in [`Self::update_role`].
    /// Returns `false` if the user is not a member.
    pub async fn remove<E, F>(
        pool: &PgPool,
        workspace_id: DbId,
        user_id: DbId,
        actor_id: DbId,
        check: F,
    ) -> Result<bool, E>
    where
        E: From<sqlx::Error>,
        F: FnOnce(&MembershipFacts) -> Result<(), E>,
    {
        let mut tx = pool.begin().await?;

        let Some(facts) = Self::lock_facts(&mut tx, workspace_id, user_id).await? else {
            return Ok(false);
        };
        check(&facts)?;

        sqlx::query("DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2")
            .bind(workspace_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "DELETE FROM project_members
             WHERE user_id = $2
               AND project_id IN (SELECT id FROM projects WHERE workspace_id = $1)",
        )
        .bind(workspace_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        ActivityRepo::append(
            &mut tx,
            &CreateActivityLog::new(
                workspace_id,
                entity_types::MEMBER,
                user_id,
                actions::MEMBER_REMOVED,
            )
            .by(actor_id),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
