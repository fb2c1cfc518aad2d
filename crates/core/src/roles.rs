//! Workspace membership roles.
//!
//! Roles form a strict total order: `owner > admin > member > viewer`.
//! The text forms must match the `CHECK` constraint on
//! `workspace_members.role`.

use std::cmp::Ordering;

define_text_enum! {
    /// A user's role within one workspace.
    WorkspaceRole("role") {
        Owner = "owner",
        Admin = "admin",
        Member = "member",
        Viewer = "viewer",
    }
}

/// Role given to users added to a workspace without an explicit role.
pub const DEFAULT_MEMBER_ROLE: WorkspaceRole = WorkspaceRole::Member;

impl WorkspaceRole {
    /// Numeric rank; higher outranks lower.
    pub fn rank(self) -> u8 {
        match self {
            WorkspaceRole::Owner => 3,
            WorkspaceRole::Admin => 2,
            WorkspaceRole::Member => 1,
            WorkspaceRole::Viewer => 0,
        }
    }

    /// `owner` and `admin` unlock the administrative surface.
    pub fn is_admin_like(self) -> bool {
        self >= WorkspaceRole::Admin
    }
}

impl PartialOrd for WorkspaceRole {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkspaceRole {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_totally_ordered() {
        assert!(WorkspaceRole::Owner > WorkspaceRole::Admin);
        assert!(WorkspaceRole::Admin > WorkspaceRole::Member);
        assert!(WorkspaceRole::Member > WorkspaceRole::Viewer);
        assert_eq!(
            WorkspaceRole::ALL.iter().max().copied(),
            Some(WorkspaceRole::Owner)
        );
    }

    #[test]
    fn admin_like_is_owner_or_admin() {
        assert!(WorkspaceRole::Owner.is_admin_like());
        assert!(WorkspaceRole::Admin.is_admin_like());
        assert!(!WorkspaceRole::Member.is_admin_like());
        assert!(!WorkspaceRole::Viewer.is_admin_like());
    }

    #[test]
    fn parse_roundtrips_text_form() {
        for role in WorkspaceRole::ALL {
            assert_eq!(role.as_str().parse::<WorkspaceRole>().unwrap(), *role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "superuser".parse::<WorkspaceRole>().unwrap_err();
        assert!(err.to_string().contains("Invalid role 'superuser'"));
        assert!("Admin".parse::<WorkspaceRole>().is_err());
    }
}
