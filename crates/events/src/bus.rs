//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application.
//! Publishing never blocks: a subscriber that falls more than the channel
//! capacity behind loses the oldest events and is told how many it missed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskdeck_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ChangeEvent
// ---------------------------------------------------------------------------

/// A committed change to one entity inside a workspace.
///
/// Constructed via [`ChangeEvent::new`] and enriched with
/// [`with_actor`](ChangeEvent::with_actor) and
/// [`with_payload`](ChangeEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub workspace_id: DbId,

    /// Activity entity type, e.g. `"task"` or `"project"`.
    pub entity_type: String,

    pub entity_id: DbId,

    /// Activity action, e.g. `"updated"` or `"moved"`.
    pub action: String,

    /// Id of the user that made the change.
    pub actor_user_id: Option<DbId>,

    /// Small JSON payload, typically the parent ids a client needs to pick
    /// which cache keys to invalidate.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(
        workspace_id: DbId,
        entity_type: impl Into<String>,
        entity_id: DbId,
        action: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id,
            entity_type: entity_type.into(),
            entity_id,
            action: action.into(),
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use taskdeck_events::bus::{ChangeEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ChangeEvent::new(1, "task", 42, "created"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. With no subscribers
    /// the event is dropped.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::trace!(
            workspace_id = event.workspace_id,
            entity_type = %event.entity_type,
            entity_id = event.entity_id,
            action = %event.action,
            "Publishing change event"
        );
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to every event on the bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to events of one workspace only.
    pub fn subscribe_workspace(&self, workspace_id: DbId) -> WorkspaceSubscription {
        WorkspaceSubscription {
            workspace_id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// WorkspaceSubscription
// ---------------------------------------------------------------------------

/// A bus receiver that yields only one workspace's events.
pub struct WorkspaceSubscription {
    workspace_id: DbId,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl WorkspaceSubscription {
    pub fn workspace_id(&self) -> DbId {
        self.workspace_id
    }

    /// Wait for the next event of this workspace.
    ///
    /// Lagged gaps are logged and skipped. Returns `None` once the bus is
    /// dropped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.workspace_id == self.workspace_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        workspace_id = self.workspace_id,
                        skipped,
                        "Change subscriber lagged; events dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            ChangeEvent::new(3, "task", 42, "moved")
                .with_actor(7)
                .with_payload(serde_json::json!({"projectId": 9})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.workspace_id, 3);
        assert_eq!(received.entity_type, "task");
        assert_eq!(received.entity_id, 42);
        assert_eq!(received.action, "moved");
        assert_eq!(received.actor_user_id, Some(7));
        assert_eq!(received.payload["projectId"], 9);
    }

    #[tokio::test]
    async fn workspace_subscription_filters_other_workspaces() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe_workspace(2);

        bus.publish(ChangeEvent::new(1, "task", 10, "created"));
        bus.publish(ChangeEvent::new(2, "task", 20, "created"));

        let event = sub.recv().await.expect("event for workspace 2");
        assert_eq!(event.entity_id, 20);
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_to_newest() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe_workspace(1);

        for id in 0..5 {
            bus.publish(ChangeEvent::new(1, "task", id, "updated"));
        }

        let first = sub.recv().await.expect("an event survives the lag");
        assert_eq!(first.entity_id, 3);
    }

    #[tokio::test]
    async fn subscription_ends_when_bus_dropped() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe_workspace(1);
        drop(bus);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(ChangeEvent::new(1, "project", 1, "deleted"));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ChangeEvent::new(1, "task", 2, "created")).unwrap();
        assert_eq!(json["workspaceId"], 1);
        assert_eq!(json["entityType"], "task");
        assert!(json["actorUserId"].is_null());
    }
}
