//! Taskdeck change-event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ChangeEvent`]: "something in workspace W changed" notice published
//!   after every committed mutation and streamed to WebSocket clients so
//!   they can invalidate cached queries.
//! - [`WorkspaceSubscription`]: a receiver narrowed to one workspace.

pub mod bus;

pub use bus::{ChangeEvent, EventBus, WorkspaceSubscription};
