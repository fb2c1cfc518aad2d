//! Repository for the append-only `activity_logs` table.

use sqlx::{PgConnection, PgPool};
use taskdeck_core::pagination::{clamp_limit, clamp_offset, DEFAULT_ACTIVITY_LIMIT, MAX_LIST_LIMIT};
use taskdeck_core::types::DbId;

use crate::models::activity::{ActivityLog, ActivityPage, ActivityQuery, CreateActivityLog};

const COLUMNS: &str =
    "id, workspace_id, entity_type, entity_id, action, user_id, changes, created_at";

/// Filter shared by the list and count queries. `$1` is the workspace.
const FILTER: &str = "workspace_id = $1 \
     AND ($2::TEXT IS NULL OR entity_type = $2) \
     AND ($3::BIGINT IS NULL OR entity_id = $3) \
     AND ($4::BIGINT IS NULL OR user_id = $4)";

pub struct ActivityRepo;

impl ActivityRepo {
    /// Append one row on the given connection.
    ///
    /// Called with a transaction so the row commits (or rolls back) with the
    /// write it describes.
    pub async fn append(
        conn: &mut PgConnection,
        input: &CreateActivityLog,
    ) -> Result<ActivityLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO activity_logs (workspace_id, entity_type, entity_id, action, user_id, changes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(input.workspace_id)
            .bind(input.entity_type)
            .bind(input.entity_id)
            .bind(input.action)
            .bind(input.user_id)
            .bind(&input.changes)
            .fetch_one(conn)
            .await
    }

    /// Newest-first page of a workspace's activity.
    pub async fn list(
        pool: &PgPool,
        workspace_id: DbId,
        params: &ActivityQuery,
    ) -> Result<ActivityPage, sqlx::Error> {
        let limit = clamp_limit(params.limit, DEFAULT_ACTIVITY_LIMIT, MAX_LIST_LIMIT);
        let offset = clamp_offset(params.offset);

        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs WHERE {FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $5 OFFSET $6"
        );
        let items = sqlx::query_as::<_, ActivityLog>(&query)
            .bind(workspace_id)
            .bind(params.entity_type.as_deref())
            .bind(params.entity_id)
            .bind(params.user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM activity_logs WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(workspace_id)
            .bind(params.entity_type.as_deref())
            .bind(params.entity_id)
            .bind(params.user_id)
            .fetch_one(pool)
            .await?;

        Ok(ActivityPage { items, total })
    }

    /// All rows for one entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<ActivityLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }
}
