//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated user from a JWT Bearer token.
//! - [`workspace::WorkspaceContext`] -- the caller's membership in the
//!   workspace named by the `{workspace_id}` path segment.

pub mod auth;
pub mod workspace;
