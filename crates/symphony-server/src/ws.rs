//! `WebSocket` session handler for the field sync protocol.
//!
//! Clients connect to `GET /ws`. Each socket becomes one participant:
//! the handler registers with the hub, forwards every decoded
//! [`ClientIntent`] upstream, and writes every [`ServerEvent`] addressed
//! to its session as a JSON text frame.
//!
//! The hub decides when a session ends. When it removes the participant
//! (eviction) the session stream closes and the socket is closed; when
//! the socket closes first, the handler reports the disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use symphony_types::{ClientIntent, ParticipantId, ServerEvent};
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` participant session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_field(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Decode one text frame into a client message.
pub fn decode_intent(text: &str) -> Result<ClientIntent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Encode one server event as a text frame.
pub fn encode_event(event: &ServerEvent) -> Result<Message, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(Message::Text(json.into()))
}

/// Drive one participant session until either side ends it.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut session = match state.hub.connect().await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Could not register WebSocket connection");
            if let Err(e) = socket.send(Message::Close(None)).await {
                debug!(error = %e, "Close frame not sent");
            }
            return;
        }
    };
    let id = session.id;
    debug!(participant = %id, "WebSocket session opened");

    loop {
        tokio::select! {
            // Outbound: events the hub addressed to this participant.
            event = session.events.recv() => {
                let Some(event) = event else {
                    debug!(participant = %id, "Session ended by hub, closing socket");
                    if let Err(e) = socket.send(Message::Close(None)).await {
                        debug!(participant = %id, error = %e, "Close frame not sent");
                    }
                    return;
                };
                let frame = match encode_event(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(participant = %id, error = %e, "Failed to serialize server event");
                        continue;
                    }
                };
                if socket.send(frame).await.is_err() {
                    debug!(participant = %id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Inbound: intents and transport frames from the client.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !forward_text(&state, id, text.as_str()).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Axum answers pings itself; the frame still proves liveness.
                        if state.hub.activity(id).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(participant = %id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(participant = %id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {
                        debug!(participant = %id, "Ignoring binary frame");
                    }
                }
            }
        }
    }

    if let Err(e) = state.hub.disconnect(id).await {
        debug!(participant = %id, error = %e, "Disconnect not delivered");
    }
}

/// Forward one text frame to the hub. Returns `false` once the hub is gone.
async fn forward_text(state: &AppState, id: ParticipantId, text: &str) -> bool {
    let delivered = match decode_intent(text) {
        Ok(intent) => state.hub.send_intent(id, intent).await,
        Err(e) => {
            warn!(participant = %id, error = %e, "Undecodable client frame dropped");
            state.hub.activity(id).await
        }
    };
    delivered.is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use symphony_types::{EmotionalVector, SharedFieldState};

    use super::*;

    #[test]
    fn decodes_position_intent() {
        let intent = decode_intent(r#"{"type":"intent-position-update","position":[0,1,2]}"#);
        assert!(matches!(intent, Ok(ClientIntent::IntentPositionUpdate { .. })));
    }

    #[test]
    fn rejects_malformed_frame() {
        assert!(decode_intent("not json").is_err());
        assert!(decode_intent(r#"{"type":"intent-vector-update","vector":{"joy":1}}"#).is_err());
    }

    #[test]
    fn encodes_events_as_text_frames() {
        let event = ServerEvent::FullState(SharedFieldState::empty(EmotionalVector::BASELINE, 0.3));
        match encode_event(&event).unwrap() {
            Message::Text(text) => assert!(text.as_str().contains(r#""type":"full-state""#)),
            other => panic!("unexpected frame {other:?}"),
        }
    }
}
