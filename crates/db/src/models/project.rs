//! Project entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskdeck_core::types::{DbId, Timestamp};

use super::deserialize_some;

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: DbId,
    pub workspace_id: DbId,
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub status: String,
    pub color: String,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    /// Defaults to `active` if omitted.
    pub status: Option<String>,
    pub color: Option<String>,
}

/// DTO for updating an existing project. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub name: Option<String>,
    pub key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub color: Option<String>,
}

/// Query parameters for listing projects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<String>,
}
