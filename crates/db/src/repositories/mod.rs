//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Helpers that must run inside a
//! caller's transaction take `&mut PgConnection` instead.

pub mod activity_repo;
pub mod dashboard_repo;
pub mod label_repo;
pub mod member_repo;
pub mod milestone_repo;
pub mod project_member_repo;
pub mod project_repo;
pub mod task_repo;
pub mod time_entry_repo;
pub mod user_repo;
pub mod workspace_repo;

pub use activity_repo::ActivityRepo;
pub use dashboard_repo::DashboardRepo;
pub use label_repo::LabelRepo;
pub use member_repo::{MemberRepo, MembershipFacts};
pub use milestone_repo::MilestoneRepo;
pub use project_member_repo::ProjectMemberRepo;
pub use project_repo::ProjectRepo;
pub use task_repo::TaskRepo;
pub use time_entry_repo::TimeEntryRepo;
pub use user_repo::UserRepo;
pub use workspace_repo::WorkspaceRepo;
