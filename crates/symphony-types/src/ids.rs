//! Participant identifier.
//!
//! Participants are keyed by the connection that created them. Ids use
//! UUID v7 (time-ordered), so an id is never handed out twice within a
//! process lifetime and sorting by id sorts by connect time.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Opaque identifier of one participant connection.
///
/// Assigned by the server when the transport connects and never reused.
/// A reconnecting client receives a fresh id. Serializes as a bare UUID
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Mint a fresh time-ordered id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying [`Uuid`].
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ParticipantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        let first = ParticipantId::new();
        let second = ParticipantId::new();
        assert_ne!(first, second);
        assert_ne!(first.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = ParticipantId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.into_inner()));
        assert_eq!(serde_json::from_str::<ParticipantId>(&json).unwrap(), id);
    }

    #[test]
    fn display_matches_the_uuid() {
        let uuid = Uuid::now_v7();
        assert_eq!(ParticipantId::from(uuid).to_string(), uuid.to_string());
    }
}
