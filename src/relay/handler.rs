//! `/ws/track` handler
//!
//! Each socket owns one `CursorTracker`. Landmark frames come in, gesture
//! updates go back to the sender and out to `gestures.*` observers.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use super::error::{RelayError, RelayResult};
use super::hub::ConnectionHub;
use super::messages::{ClientMessage, RelayEvent, ServerMessage};
use super::state::RelayState;
use crate::client::dto::UserPublic;
use crate::vision::{CursorTracker, HandLandmarks};

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// Authenticate (when required), then upgrade
pub async fn track_handler(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<TrackParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> RelayResult<Response> {
    if state.config.require_auth {
        let user = authorize(&state, params.token.as_deref()).await?;
        tracing::debug!(username = %user.username, "Relay token accepted");
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let tracker = CursorTracker::new(state.config.tracker.clone())
        .map_err(|e| RelayError::Internal(e.to_string()))?;
    let hub = Arc::clone(&state.hub);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, tracker)))
}

async fn authorize(state: &RelayState, token: Option<&str>) -> RelayResult<UserPublic> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RelayError::Unauthorized("Missing token".to_string()))?;
    let client = state
        .auth
        .as_ref()
        .ok_or_else(|| RelayError::Internal("No auth backend configured".to_string()))?;

    match client.me_with_token(token).await {
        Ok(user) => Ok(user),
        Err(e) if e.is_unauthorized() => Err(RelayError::Unauthorized("Invalid token".to_string())),
        Err(e) => Err(RelayError::AuthUnavailable(e)),
    }
}

async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>, tracker: CursorTracker) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting relay connection");
            if let Some(text) = encode(&ServerMessage::error(e.to_string())) {
                let _ = sender.send(Message::Text(text)).await;
            }
            return;
        }
    };

    let connected = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let sent = match encode(&connected) {
        Some(text) => sender.send(Message::Text(text)).await.is_ok(),
        None => false,
    };
    if !sent {
        tracing::debug!(connection_id = %connection_id, "Failed to send connected message");
        hub.unregister(&connection_id).await;
        return;
    }

    let conn_id_for_send = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(text) = encode(&msg) else { continue };
            if sender.send(Message::Text(text)).await.is_err() {
                tracing::debug!(connection_id = %conn_id_for_send, "Socket send failed, closing");
                break;
            }
        }
    });

    let mut session = TrackSession::new(connection_id.clone(), Arc::clone(&hub), tracker);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !session.handle_message(msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(connection_id = %session.id, error = %e, "Socket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(&connection_id).await;
}

fn encode(msg: &ServerMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize relay message");
            None
        }
    }
}

// ============================================================================
// PER-CONNECTION STATE
// ============================================================================

/// Tracker and identity of one socket
pub(crate) struct TrackSession {
    id: String,
    hub: Arc<ConnectionHub>,
    tracker: CursorTracker,
    started: Instant,
}

impl TrackSession {
    pub(crate) fn new(id: String, hub: Arc<ConnectionHub>, tracker: CursorTracker) -> Self {
        Self {
            id,
            hub,
            tracker,
            started: Instant::now(),
        }
    }

    /// Returns false when the connection should close
    pub(crate) async fn handle_message(&mut self, message: Message) -> bool {
        match message {
            Message::Text(text) => {
                self.handle_text(&text).await;
                true
            }
            Message::Binary(_) => {
                self.reply(ServerMessage::error("Binary messages not supported"))
                    .await;
                true
            }
            Message::Ping(_) | Message::Pong(_) => true,
            Message::Close(_) => {
                tracing::debug!(connection_id = %self.id, "Client requested close");
                false
            }
        }
    }

    pub(crate) async fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle_client_message(msg).await,
            Err(e) => {
                tracing::debug!(connection_id = %self.id, error = %e, "Invalid client message");
                self.reply(ServerMessage::error(format!("Invalid message format: {e}")))
                    .await;
            }
        }
    }

    async fn handle_client_message(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::Frame {
                landmarks,
                timestamp_ms,
            } => {
                let now_ms =
                    timestamp_ms.unwrap_or_else(|| self.started.elapsed().as_millis() as u64);

                let hand = if landmarks.is_empty() {
                    None
                } else {
                    match HandLandmarks::from_slice(&landmarks) {
                        Ok(hand) => Some(hand),
                        Err(e) => {
                            self.reply(ServerMessage::error(format!("Invalid frame: {e}")))
                                .await;
                            return;
                        }
                    }
                };

                let update = self.tracker.update(hand.as_ref(), now_ms);
                self.reply(ServerMessage::gesture(&self.id, &update)).await;
                self.hub
                    .publish(&RelayEvent::gesture(&self.id, &update))
                    .await;
            }
            ClientMessage::Configure {
                width,
                height,
                mirrored,
            } => {
                if width == 0 || height == 0 {
                    self.reply(ServerMessage::error("Canvas dimensions must be non-zero"))
                        .await;
                    return;
                }
                self.tracker.resize(width, height);
                if let Some(mirrored) = mirrored {
                    self.tracker.set_mirrored(mirrored);
                }
                let config = self.tracker.config();
                let reply = ServerMessage::Configured {
                    width: config.width,
                    height: config.height,
                    mirrored: config.mirrored,
                };
                self.reply(reply).await;
            }
            ClientMessage::Reset => {
                self.tracker.reset();
                tracing::debug!(connection_id = %self.id, "Tracker reset");
            }
            ClientMessage::Subscribe { topics } => {
                let reply = match self.hub.subscribe(&self.id, topics).await {
                    Ok(topics) => ServerMessage::Subscribed { topics },
                    Err(e) => ServerMessage::error(e.to_string()),
                };
                self.reply(reply).await;
            }
            ClientMessage::Unsubscribe { topics } => {
                let reply = match self.hub.unsubscribe(&self.id, topics).await {
                    Ok(topics) => ServerMessage::Unsubscribed { topics },
                    Err(e) => ServerMessage::error(e.to_string()),
                };
                self.reply(reply).await;
            }
            ClientMessage::Ping => self.reply(ServerMessage::Pong).await,
        }
    }

    async fn reply(&self, message: ServerMessage) {
        if let Err(e) = self.hub.send_to(&self.id, message).await {
            tracing::debug!(connection_id = %self.id, error = %e, "Reply dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::hub::HubConfig;
    use crate::vision::landmarks::fixtures;
    use crate::vision::{Gesture, StrokeAction, TrackerConfig};
    use serde_json::json;

    async fn session() -> (TrackSession, mpsc::UnboundedReceiver<ServerMessage>) {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        let tracker = CursorTracker::new(TrackerConfig {
            smoothing_alpha: 1.0,
            ..Default::default()
        })
        .unwrap();
        (TrackSession::new(id, hub, tracker), rx)
    }

    fn frame(hand: &HandLandmarks, ts: u64) -> String {
        json!({ "type": "frame", "landmarks": hand, "timestamp_ms": ts }).to_string()
    }

    #[tokio::test]
    async fn test_empty_frame_is_no_hand() {
        let (mut session, mut rx) = session().await;
        session
            .handle_text(r#"{"type":"frame","landmarks":[]}"#)
            .await;

        match rx.try_recv().unwrap() {
            ServerMessage::Gesture {
                gesture,
                label,
                is_drawing,
                x,
                ..
            } => {
                assert_eq!(gesture, Gesture::None);
                assert_eq!(label, "No hand");
                assert!(!is_drawing);
                assert_eq!(x, None);
            }
            other => panic!("Expected gesture, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_index_frames_draw_a_stroke() {
        let (mut session, mut rx) = session().await;
        let hand = fixtures::index_only((0.25, 0.5));

        session.handle_text(&frame(&hand, 0)).await;
        session.handle_text(&frame(&hand, 33)).await;

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        match (first, second) {
            (
                ServerMessage::Gesture {
                    action: StrokeAction::Dot { at },
                    is_drawing: true,
                    ..
                },
                ServerMessage::Gesture {
                    action: StrokeAction::Segment { .. },
                    ..
                },
            ) => {
                // mirrored: (1 - 0.25) * 640
                assert!((at.x - 480.0).abs() < 1e-3);
                assert!((at.y - 240.0).abs() < 1e-3);
            }
            other => panic!("Unexpected replies {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_messages_keep_connection() {
        let (mut session, mut rx) = session().await;

        session.handle_text("not json").await;
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Error { .. }));

        let short = r#"{"type":"frame","landmarks":[{"x":0.1,"y":0.1,"z":0}]}"#;
        session.handle_text(short).await;
        match rx.try_recv().unwrap() {
            ServerMessage::Error { message } => assert!(message.starts_with("Invalid frame")),
            other => panic!("Expected error, got {other:?}"),
        }

        assert!(session.handle_message(Message::Text("{}".into())).await);
        assert!(!session.handle_message(Message::Close(None)).await);
    }

    #[tokio::test]
    async fn test_configure_and_ping() {
        let (mut session, mut rx) = session().await;

        session
            .handle_text(r#"{"type":"configure","width":100,"height":50,"mirrored":false}"#)
            .await;
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::Configured {
                width: 100,
                height: 50,
                mirrored: false
            }
        );

        session
            .handle_text(r#"{"type":"configure","width":0,"height":50}"#)
            .await;
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Error { .. }));

        session.handle_text(r#"{"type":"ping"}"#).await;
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::Pong);
    }

    #[tokio::test]
    async fn test_observer_receives_updates() {
        let (mut session, mut rx) = session().await;
        let (tx_obs, mut rx_obs) = mpsc::unbounded_channel();
        let observer = session.hub.register(tx_obs).await.unwrap();
        session
            .hub
            .subscribe(&observer, vec!["gestures.*".into()])
            .await
            .unwrap();

        session.handle_text(&frame(&fixtures::open_palm(), 0)).await;

        assert!(rx.try_recv().is_ok());
        match rx_obs.try_recv().unwrap() {
            ServerMessage::Gesture {
                connection_id,
                gesture,
                ..
            } => {
                assert_eq!(connection_id, session.id);
                assert_eq!(gesture, Gesture::Clear);
            }
            other => panic!("Expected gesture, got {other:?}"),
        }
    }
}
