//! Central authorization policy.
//!
//! Every mutating endpoint asks [`authorize`] whether the caller's workspace
//! role permits the [`Action`]. UI code may hide controls using
//! [`is_allowed`], but the server check is the one that counts.
//!
//! Membership changes carry extra invariants (owner-only grants, at least
//! one owner) and go through [`check_member_grant`],
//! [`check_role_change`], and [`check_member_removal`].

use crate::error::CoreError;
use crate::roles::WorkspaceRole;
use crate::types::DbId;

/// Something a workspace member may try to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read anything inside the workspace.
    ViewWorkspace,
    /// Create, update, move, bulk-update, or delete tasks and subtasks.
    EditTasks,
    /// Log time against a task, or delete one's own time entry.
    LogTime,
    /// Delete a time entry logged by someone else.
    DeleteOthersTimeEntry,
    /// Read the activity log.
    ViewActivity,
    /// Create, update, or delete projects and their member lists.
    ManageProjects,
    /// Create, update, or delete milestones.
    ManageMilestones,
    /// Create or delete labels.
    ManageLabels,
    /// Rename the workspace or change its settings.
    UpdateWorkspace,
    /// Add, re-role, or remove members.
    ManageMembers,
    /// Grant or revoke the owner role.
    ManageOwners,
    /// Delete the workspace and everything in it.
    DeleteWorkspace,
}

impl Action {
    /// The lowest role allowed to perform this action.
    pub fn required_role(self) -> WorkspaceRole {
        match self {
            Action::ViewWorkspace => WorkspaceRole::Viewer,
            Action::EditTasks | Action::LogTime | Action::ViewActivity => WorkspaceRole::Member,
            Action::DeleteOthersTimeEntry
            | Action::ManageProjects
            | Action::ManageMilestones
            | Action::ManageLabels
            | Action::UpdateWorkspace
            | Action::ManageMembers => WorkspaceRole::Admin,
            Action::ManageOwners | Action::DeleteWorkspace => WorkspaceRole::Owner,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Action::ViewWorkspace => "Viewing this workspace",
            Action::EditTasks => "Editing tasks",
            Action::LogTime => "Logging time",
            Action::DeleteOthersTimeEntry => "Deleting another user's time entry",
            Action::ViewActivity => "Viewing activity",
            Action::ManageProjects => "Managing projects",
            Action::ManageMilestones => "Managing milestones",
            Action::ManageLabels => "Managing labels",
            Action::UpdateWorkspace => "Updating the workspace",
            Action::ManageMembers => "Managing members",
            Action::ManageOwners => "Granting or revoking ownership",
            Action::DeleteWorkspace => "Deleting the workspace",
        }
    }
}

/// Returns `true` if `role` may perform `action`.
pub fn is_allowed(role: WorkspaceRole, action: Action) -> bool {
    role >= action.required_role()
}

/// Allow or deny `action` for `role`, with a 403-style error on denial.
pub fn authorize(role: WorkspaceRole, action: Action) -> Result<(), CoreError> {
    if is_allowed(role, action) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "{} requires the {} role or higher",
            action.describe(),
            action.required_role()
        )))
    }
}

/// Check that `actor` may add a new member with `granted` role.
pub fn check_member_grant(actor: WorkspaceRole, granted: WorkspaceRole) -> Result<(), CoreError> {
    authorize(actor, Action::ManageMembers)?;
    if granted == WorkspaceRole::Owner {
        authorize(actor, Action::ManageOwners)?;
    }
    Ok(())
}

/// Check that `actor` may change a member from `current` to `new_role`.
///
/// `owner_count` is the number of owners in the workspace before the change.
pub fn check_role_change(
    actor: WorkspaceRole,
    current: WorkspaceRole,
    new_role: WorkspaceRole,
    owner_count: i64,
) -> Result<(), CoreError> {
    authorize(actor, Action::ManageMembers)?;
    if current == WorkspaceRole::Owner || new_role == WorkspaceRole::Owner {
        authorize(actor, Action::ManageOwners)?;
    }
    if current == WorkspaceRole::Owner && new_role != WorkspaceRole::Owner && owner_count <= 1 {
        return Err(last_owner_conflict());
    }
    Ok(())
}

/// Check that `actor_id` (with role `actor`) may remove `target_id`.
///
/// Any member may remove themselves (leave). Removing someone else needs
/// `ManageMembers`, and removing an owner needs `ManageOwners`. The last
/// owner can never be removed.
pub fn check_member_removal(
    actor_id: DbId,
    actor: WorkspaceRole,
    target_id: DbId,
    target: WorkspaceRole,
    owner_count: i64,
) -> Result<(), CoreError> {
    if actor_id != target_id {
        authorize(actor, Action::ManageMembers)?;
        if target == WorkspaceRole::Owner {
            authorize(actor, Action::ManageOwners)?;
        }
    }
    if target == WorkspaceRole::Owner && owner_count <= 1 {
        return Err(last_owner_conflict());
    }
    Ok(())
}

fn last_owner_conflict() -> CoreError {
    CoreError::Conflict("A workspace must keep at least one owner".to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use WorkspaceRole::{Admin, Member, Owner, Viewer};

    #[test]
    fn viewer_can_only_view() {
        assert!(is_allowed(Viewer, Action::ViewWorkspace));
        for action in [
            Action::EditTasks,
            Action::LogTime,
            Action::ViewActivity,
            Action::ManageProjects,
            Action::ManageMembers,
            Action::DeleteWorkspace,
        ] {
            assert!(!is_allowed(Viewer, action), "viewer must not {action:?}");
        }
    }

    #[test]
    fn member_edits_tasks_but_not_projects() {
        assert!(is_allowed(Member, Action::EditTasks));
        assert!(is_allowed(Member, Action::LogTime));
        assert!(!is_allowed(Member, Action::ManageProjects));
        assert!(!is_allowed(Member, Action::DeleteOthersTimeEntry));
    }

    #[test]
    fn admin_manages_but_cannot_delete_workspace() {
        assert!(is_allowed(Admin, Action::ManageProjects));
        assert!(is_allowed(Admin, Action::ManageMembers));
        assert!(!is_allowed(Admin, Action::ManageOwners));
        assert!(!is_allowed(Admin, Action::DeleteWorkspace));
        assert!(is_allowed(Owner, Action::DeleteWorkspace));
    }

    #[test]
    fn denial_is_forbidden_with_required_role() {
        let err = authorize(Viewer, Action::EditTasks).unwrap_err();
        assert_matches!(err, CoreError::Forbidden(ref msg) if msg.contains("member"));
    }

    #[test]
    fn only_owner_grants_owner() {
        assert!(check_member_grant(Admin, Member).is_ok());
        assert_matches!(check_member_grant(Admin, Owner), Err(CoreError::Forbidden(_)));
        assert!(check_member_grant(Owner, Owner).is_ok());
        assert_matches!(check_member_grant(Member, Viewer), Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn last_owner_cannot_be_demoted() {
        assert_matches!(
            check_role_change(Owner, Owner, Admin, 1),
            Err(CoreError::Conflict(_))
        );
        assert!(check_role_change(Owner, Owner, Admin, 2).is_ok());
    }

    #[test]
    fn admin_cannot_touch_owner_membership() {
        assert_matches!(
            check_role_change(Admin, Owner, Member, 2),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            check_member_removal(1, Admin, 2, Owner, 2),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn anyone_may_leave_except_last_owner() {
        assert!(check_member_removal(5, Viewer, 5, Viewer, 1).is_ok());
        assert!(check_member_removal(5, Owner, 5, Owner, 2).is_ok());
        assert_matches!(
            check_member_removal(5, Owner, 5, Owner, 1),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn member_cannot_remove_others() {
        assert_matches!(
            check_member_removal(1, Member, 2, Viewer, 1),
            Err(CoreError::Forbidden(_))
        );
        assert!(check_member_removal(1, Admin, 2, Member, 1).is_ok());
    }
}
