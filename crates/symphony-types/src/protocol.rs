//! Wire vocabulary of the synchronization channel.
//!
//! Both directions are JSON text frames tagged by a kebab-case `type`
//! field, e.g. `{"type":"intent-vector-update","vector":{...}}`.
//! Whole-state events flatten the [`SharedFieldState`] fields next to the
//! tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ParticipantId;
use crate::structs::{DisplayColor, ParticipantRecord, SharedFieldState};
use crate::vector::{EmotionalVector, Position};

/// Client to server messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientIntent {
    /// Replace the sender's emotional vector. Out-of-range components are
    /// clamped by the server.
    IntentVectorUpdate {
        /// The proposed vector.
        vector: EmotionalVector,
    },
    /// Move the sender.
    IntentPositionUpdate {
        /// The new position.
        position: Position,
    },
    /// Keep the connection alive. Answered with
    /// [`ServerEvent::LivenessPong`].
    LivenessPing,
    /// Ask for a [`ServerEvent::FullState`] addressed to the sender only.
    RequestFullState,
}

impl ClientIntent {
    /// Short name for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IntentVectorUpdate { .. } => "intent-vector-update",
            Self::IntentPositionUpdate { .. } => "intent-position-update",
            Self::LivenessPing => "liveness-ping",
            Self::RequestFullState => "request-full-state",
        }
    }
}

/// Why a participant left the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum LeaveReason {
    /// The transport closed.
    Disconnected,
    /// The liveness sweep evicted a silent connection.
    TimedOut,
}

/// Server to client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerEvent {
    /// First message on a new connection: the id and color the server
    /// assigned.
    Welcome {
        /// The receiving connection's own participant id.
        id: ParticipantId,
        /// The receiving connection's display color.
        color: DisplayColor,
    },
    /// Complete replacement of the client's replica.
    FullState(SharedFieldState),
    /// A participant connected.
    ParticipantJoined {
        /// The new record.
        participant: ParticipantRecord,
    },
    /// A participant disconnected or was evicted.
    ParticipantLeft {
        /// The departed participant.
        id: ParticipantId,
        /// Explicit disconnect or liveness timeout.
        reason: LeaveReason,
    },
    /// Whole state after a vector-driven recompute.
    StateUpdated(SharedFieldState),
    /// Another participant moved.
    PositionUpdated {
        /// Who moved.
        id: ParticipantId,
        /// Where to.
        position: Position,
    },
    /// Reply to [`ClientIntent::LivenessPing`].
    LivenessPong {
        /// Server time of the reply.
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// Short name for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::FullState(_) => "full-state",
            Self::ParticipantJoined { .. } => "participant-joined",
            Self::ParticipantLeft { .. } => "participant-left",
            Self::StateUpdated(_) => "state-updated",
            Self::PositionUpdated { .. } => "position-updated",
            Self::LivenessPong { .. } => "liveness-pong",
        }
    }

    /// Whether the event changes the shared field and so must not be lost
    /// without a later full resync.
    pub const fn mutates_field(&self) -> bool {
        matches!(
            self,
            Self::FullState(_)
                | Self::ParticipantJoined { .. }
                | Self::ParticipantLeft { .. }
                | Self::StateUpdated(_)
                | Self::PositionUpdated { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn intents_decode_from_tagged_json() {
        let raw = r#"{"type":"intent-vector-update","vector":{"joy":1.5,"excitement":0,"calm":0,"curiosity":0,"intensity":0,"fluidity":0,"connection":0}}"#;
        let intent: ClientIntent = serde_json::from_str(raw).unwrap();
        match intent {
            ClientIntent::IntentVectorUpdate { vector } => {
                assert!(vector.joy > 1.0, "decoding must not clamp");
            }
            other => panic!("unexpected intent {other:?}"),
        }

        let ping: ClientIntent = serde_json::from_str(r#"{"type":"liveness-ping"}"#).unwrap();
        assert_eq!(ping, ClientIntent::LivenessPing);

        let moved: ClientIntent =
            serde_json::from_str(r#"{"type":"intent-position-update","position":[1,2,3]}"#)
                .unwrap();
        assert_eq!(
            moved,
            ClientIntent::IntentPositionUpdate {
                position: Position::new(1.0, 2.0, 3.0)
            }
        );
    }

    #[test]
    fn unknown_intent_is_rejected() {
        let result = serde_json::from_str::<ClientIntent>(r#"{"type":"emotional-update"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn whole_state_events_flatten_the_snapshot() {
        let event = ServerEvent::StateUpdated(SharedFieldState::empty(
            EmotionalVector::BASELINE,
            0.3,
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state-updated");
        assert_eq!(json["connectionStrength"], 0.3);
        assert!(json["participants"].as_array().unwrap().is_empty());
        assert_eq!(json["aggregateField"]["calm"], 0.7);

        let back: ServerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn leave_event_carries_reason() {
        let id = ParticipantId::new();
        let json = serde_json::to_value(ServerEvent::ParticipantLeft {
            id,
            reason: LeaveReason::TimedOut,
        })
        .unwrap();
        assert_eq!(json["type"], "participant-left");
        assert_eq!(json["reason"], "timed-out");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn pong_does_not_mutate_field() {
        let pong = ServerEvent::LivenessPong {
            timestamp: Utc::now(),
        };
        assert!(!pong.mutates_field());
        assert_eq!(pong.kind(), "liveness-pong");
    }
}
