//! Workspace and project membership models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskdeck_core::types::{DbId, Timestamp};

/// A row from the `workspace_members` table.
///
/// One row per (user, workspace); `role` is one of the
/// [`WorkspaceRole`](taskdeck_core::roles::WorkspaceRole) text forms.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: DbId,
    pub workspace_id: DbId,
    pub user_id: DbId,
    pub role: String,
    pub joined_at: Timestamp,
}

/// A workspace member joined with the user's public profile.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberWithUser {
    pub user_id: DbId,
    pub email: String,
    pub name: String,
    pub role: String,
    pub joined_at: Timestamp,
}

/// DTO for adding an existing user to a workspace by email.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMember {
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRole {
    pub role: String,
}

/// A project member joined with the user's public profile.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub project_id: DbId,
    pub user_id: DbId,
    pub email: String,
    pub name: String,
    pub added_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProjectMember {
    pub user_id: DbId,
}
