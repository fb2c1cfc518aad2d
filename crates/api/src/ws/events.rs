use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use taskdeck_core::activity::{actions, entity_types};
use taskdeck_core::types::DbId;
use taskdeck_events::{ChangeEvent, WorkspaceSubscription};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::workspace::WorkspaceContext;
use crate::state::AppState;

/// Interval between heartbeat pings (in seconds).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// `?token=` on the upgrade request. Browsers cannot set an
/// `Authorization` header on a WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct EventsParams {
    pub token: String,
}

/// GET /api/v1/workspaces/{workspace_id}/events
///
/// Authenticates and checks membership before upgrading, so a bad token
/// gets `401` and a non-member `404` as plain HTTP responses.
pub async fn events_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(workspace_id): Path<DbId>,
    Query(params): Query<EventsParams>,
) -> AppResult<impl IntoResponse> {
    let auth = AuthUser::from_token(&params.token, &state.config.jwt)?;
    let ctx = WorkspaceContext::load(&state, auth.user_id, workspace_id).await?;

    // Subscribe before the upgrade so no change committed after the
    // handshake response is missed.
    let subscription = state.event_bus.subscribe_workspace(ctx.workspace_id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, subscription, ctx.user_id)))
}

/// Whether `event` ends `user_id`'s access to the workspace it came from.
pub fn revokes_access(event: &ChangeEvent, user_id: DbId) -> bool {
    match (event.entity_type.as_str(), event.action.as_str()) {
        (entity_types::WORKSPACE, actions::DELETED) => true,
        (entity_types::MEMBER, actions::MEMBER_REMOVED) => event.entity_id == user_id,
        _ => false,
    }
}

/// Pump workspace events into the socket until either side goes away.
///
/// A sender task forwards bus events and periodic pings; the current task
/// drains inbound frames. The socket is closed once the user loses access
/// to the workspace: the revoking event is delivered, then `Close`.
async fn handle_socket(socket: WebSocket, mut subscription: WorkspaceSubscription, user_id: DbId) {
    let workspace_id = subscription.workspace_id();
    tracing::info!(workspace_id, user_id, "Change stream connected");

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        heartbeat.tick().await;

        loop {
            let (message, revoked) = tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => match serde_json::to_string(&event) {
                        Ok(json) => (Message::Text(json.into()), revokes_access(&event, user_id)),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize change event");
                            continue;
                        }
                    },
                    // Bus dropped: server is shutting down.
                    None => (Message::Close(None), false),
                },
                _ = heartbeat.tick() => (Message::Ping(Default::default()), false),
            };

            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
            if revoked {
                tracing::info!(workspace_id, user_id, "Workspace access revoked; closing change stream");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    });

    let receive = async {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => {
                    tracing::trace!(workspace_id, user_id, "Pong received");
                }
                // The stream is one-way; anything else from the client is ignored.
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(workspace_id, user_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = &mut send_task => {}
        _ = receive => send_task.abort(),
    }
    tracing::info!(workspace_id, user_id, "Change stream disconnected");
}
