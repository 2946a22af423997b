//! WebSocket push channel
//!
//! Each client receives the current snapshot on connect, then every snapshot
//! change and every notification as JSON text frames.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::notify::Notification;
use crate::player::PlayerSnapshot;
use crate::ui::server::AppState;

/// Messages pushed to clients
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WsOutgoing {
    Snapshot(PlayerSnapshot),
    Notification(Notification),
}

impl WsOutgoing {
    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text)),
            Err(e) => {
                tracing::warn!("Failed to encode WebSocket message: {}", e);
                None
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut snapshots = state.player.subscribe();
    let mut notifications = state.notifications.subscribe();

    tracing::debug!("WebSocket client connected");

    let initial = WsOutgoing::Snapshot(snapshots.borrow_and_update().clone());
    if let Some(msg) = initial.to_message() {
        if sender.send(msg).await.is_err() {
            return;
        }
    }

    loop {
        let outgoing = tokio::select! {
            changed = snapshots.changed() => match changed {
                Ok(()) => WsOutgoing::Snapshot(snapshots.borrow_and_update().clone()),
                // Player task is gone
                Err(_) => break,
            },
            note = notifications.recv() => match note {
                Ok(note) => WsOutgoing::Notification(note),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("WebSocket client skipped {} notifications", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        };

        if let Some(msg) = outgoing.to_message() {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    }

    tracing::debug!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlaybackState;

    #[test]
    fn test_outgoing_is_tagged() {
        let snapshot = PlayerSnapshot {
            playback_state: PlaybackState::Playing,
            volume: 80,
            ..PlayerSnapshot::default()
        };
        let json = serde_json::to_value(WsOutgoing::Snapshot(snapshot)).unwrap();
        assert_eq!(json["type"], "snapshot");
        assert_eq!(json["playback_state"], "playing");

        let json =
            serde_json::to_value(WsOutgoing::Notification(Notification::info("hola"))).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["message"], "hola");
        assert_eq!(json["level"], "info");
    }
}
