//! Activity log entity model and DTOs.
//!
//! Activity rows are append-only (no `updated_at`).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskdeck_core::types::{DbId, Timestamp};

/// A single activity log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: DbId,
    pub workspace_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action: String,
    pub user_id: Option<DbId>,
    pub changes: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for appending an activity row.
///
/// Built with [`CreateActivityLog::new`] and the `by` / `with_changes`
/// builder methods.
#[derive(Debug, Clone)]
pub struct CreateActivityLog {
    pub workspace_id: DbId,
    pub entity_type: &'static str,
    pub entity_id: DbId,
    pub action: &'static str,
    pub user_id: Option<DbId>,
    pub changes: serde_json::Value,
}

impl CreateActivityLog {
    pub fn new(
        workspace_id: DbId,
        entity_type: &'static str,
        entity_id: DbId,
        action: &'static str,
    ) -> Self {
        Self {
            workspace_id,
            entity_type,
            entity_id,
            action,
            user_id: None,
            changes: serde_json::Value::Object(Default::default()),
        }
    }

    /// Attach the acting user.
    pub fn by(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_changes(mut self, changes: serde_json::Value) -> Self {
        self.changes = changes;
        self
    }
}

/// Filter parameters for querying the activity log.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated response for activity queries.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub items: Vec<ActivityLog>,
    pub total: i64,
}
