//! Participant records and shared field snapshots.
//!
//! [`ParticipantRecord`] values are owned by the server-side store; every
//! other holder sees a copy inside a [`SharedFieldState`] snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ParticipantId;
use crate::vector::{EmotionalVector, Position};

/// Display hint assigned once when a participant connects.
///
/// Serialized as a CSS `hsl()` string so the front end can use it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct DisplayColor(pub String);

impl DisplayColor {
    /// Saturation used for every sampled color, in percent.
    pub const SATURATION: u8 = 70;
    /// Lightness used for every sampled color, in percent.
    pub const LIGHTNESS: u8 = 60;

    /// Build a color from a hue in degrees.
    pub fn from_hue(hue: f64) -> Self {
        Self(format!(
            "hsl({hue:.1}, {}%, {}%)",
            Self::SATURATION,
            Self::LIGHTNESS
        ))
    }

    /// The CSS string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One connected participant as the server knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ParticipantRecord {
    /// Connection-assigned identifier.
    pub id: ParticipantId,
    /// Latest clamped emotional vector.
    pub emotional_vector: EmotionalVector,
    /// Latest reported position.
    pub position: Position,
    /// Display color, fixed for the lifetime of the record.
    pub color: DisplayColor,
    /// Time of the last inbound message from this participant.
    pub last_activity: DateTime<Utc>,
}

/// Point-in-time copy of the whole shared field.
///
/// `participants` is ordered by id. `aggregate_field` and
/// `connection_strength` are derived by the server and never set by
/// clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SharedFieldState {
    /// Every current participant.
    pub participants: Vec<ParticipantRecord>,
    /// Component-wise mean of all participant vectors.
    pub aggregate_field: EmotionalVector,
    /// Mean 4-dimension cosine similarity, in `[0, 1]`.
    pub connection_strength: f64,
}

impl SharedFieldState {
    /// An empty field carrying the given derived values.
    pub const fn empty(aggregate_field: EmotionalVector, connection_strength: f64) -> Self {
        Self {
            participants: Vec::new(),
            aggregate_field,
            connection_strength,
        }
    }

    /// Look up one participant by id.
    pub fn participant(&self, id: ParticipantId) -> Option<&ParticipantRecord> {
        self.participants.iter().find(|p| p.id == id)
    }
}

/// Operational status report served outside the sync protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FieldStatus {
    /// Liveness of the service (`"healthy"` while the event loop runs).
    pub status: String,
    /// Service name.
    pub service: String,
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
    /// Number of connected participants.
    pub active_participants: usize,
    /// Current aggregate field.
    pub aggregate_field: EmotionalVector,
    /// Current connection strength.
    pub connection_strength: f64,
}
