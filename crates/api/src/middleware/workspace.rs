//! Workspace membership extractor.
//!
//! Every `/workspaces/{workspace_id}/...` route is scoped to one workspace.
//! [`WorkspaceContext`] authenticates the caller, reads `{workspace_id}`
//! from the path, and resolves the caller's role there. Non-members get
//! `404` so workspace ids are not probeable. Handlers then call
//! [`WorkspaceContext::require`] with the action they are about to perform.

use axum::extract::{FromRequestParts, RawPathParams};
use axum::http::request::Parts;
use taskdeck_core::error::CoreError;
use taskdeck_core::policy::{authorize, Action};
use taskdeck_core::roles::WorkspaceRole;
use taskdeck_core::types::DbId;
use taskdeck_db::repositories::MemberRepo;
use taskdeck_events::ChangeEvent;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

const WORKSPACE_PARAM: &str = "workspace_id";

/// The authenticated caller's membership in the addressed workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub user_id: DbId,
    pub workspace_id: DbId,
    pub role: WorkspaceRole,
}

impl WorkspaceContext {
    /// Resolve `user_id`'s role in `workspace_id`.
    pub async fn load(state: &AppState, user_id: DbId, workspace_id: DbId) -> Result<Self, AppError> {
        let role = MemberRepo::find_role(&state.pool, workspace_id, user_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Workspace",
                id: workspace_id,
            }))?;
        let role = role.parse::<WorkspaceRole>().map_err(|_| {
            AppError::InternalError(format!("Stored role '{role}' is not a known role"))
        })?;

        Ok(Self {
            user_id,
            workspace_id,
            role,
        })
    }

    /// Fail with `403` unless the caller's role permits `action`.
    pub fn require(&self, action: Action) -> Result<(), AppError> {
        authorize(self.role, action)?;
        Ok(())
    }

    /// A change event in this workspace, attributed to the caller.
    pub fn change(&self, entity_type: &str, entity_id: DbId, action: &str) -> ChangeEvent {
        ChangeEvent::new(self.workspace_id, entity_type, entity_id, action).with_actor(self.user_id)
    }
}

impl FromRequestParts<AppState> for WorkspaceContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let params = RawPathParams::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let raw = params
            .iter()
            .find(|(name, _)| *name == WORKSPACE_PARAM)
            .map(|(_, value)| value)
            .ok_or_else(|| {
                AppError::InternalError("Route has no {workspace_id} segment".into())
            })?;
        let workspace_id: DbId = raw
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid workspace id '{raw}'")))?;

        Self::load(state, auth.user_id, workspace_id).await
    }
}
