//! WebSocket change stream.
//!
//! Clients open `/api/v1/workspaces/{workspace_id}/events?token=<jwt>` and
//! receive every committed change in that workspace as a JSON
//! [`ChangeEvent`](taskdeck_events::ChangeEvent) text frame.

mod events;

pub use events::{events_handler, EventsParams, HEARTBEAT_INTERVAL_SECS};
