//! Domain rules for Taskdeck.
//!
//! This crate has no I/O: it holds the vocabularies (statuses, priorities,
//! roles), validation functions, the authorization policy, and the read-time
//! aggregates (task stats, subtask progress) shared by the database layer,
//! the API server, and the client library.

#[macro_use]
mod macros;

pub mod activity;
pub mod error;
pub mod milestone;
pub mod pagination;
pub mod policy;
pub mod project;
pub mod roles;
pub mod stats;
pub mod task;
pub mod time_tracking;
pub mod types;
pub mod workspace;
