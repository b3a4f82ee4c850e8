//! Local replica of the shared field.
//!
//! [`ClientMirror`] holds what one participant renders: the last
//! authoritative [`SharedFieldState`] from the server plus the
//! participant's own vector and position. Local edits apply immediately
//! and produce the [`ClientIntent`] the caller must send upstream. The
//! server is last-writer-wins: every whole-state event replaces the
//! replica and overwrites the provisional local vector.

use chrono::{DateTime, Utc};
use symphony_types::{
    ClientIntent, Dimension, DisplayColor, EmotionalVector, ParticipantId, ParticipantRecord,
    Position, ServerEvent, SharedFieldState,
};
use tracing::debug;

/// Transport state reported to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// First connection in progress.
    Connecting,
    /// Connected and welcomed by the server.
    Connected,
    /// Transport lost; retrying.
    Reconnecting {
        /// 1-based attempt currently in flight.
        attempt: u32,
    },
    /// Retries exhausted.
    Disconnected,
}

/// One participant's view of the shared field.
#[derive(Debug, Clone)]
pub struct ClientMirror {
    self_id: Option<ParticipantId>,
    color: Option<DisplayColor>,
    replica: SharedFieldState,
    local_vector: EmotionalVector,
    local_position: Position,
    status: ConnectionStatus,
    last_pong: Option<DateTime<Utc>>,
}

impl Default for ClientMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientMirror {
    /// An empty mirror awaiting its first connection.
    pub const fn new() -> Self {
        Self {
            self_id: None,
            color: None,
            replica: SharedFieldState::empty(EmotionalVector::BASELINE, 0.0),
            local_vector: EmotionalVector::BASELINE,
            local_position: Position::ORIGIN,
            status: ConnectionStatus::Connecting,
            last_pong: None,
        }
    }

    /// Replace the local vector and return the intent announcing it.
    pub fn set_local_vector(&mut self, vector: EmotionalVector) -> ClientIntent {
        self.local_vector = vector.clamped();
        ClientIntent::IntentVectorUpdate {
            vector: self.local_vector,
        }
    }

    /// Change one dimension of the local vector, clamped to `[0, 1]`.
    pub fn update_emotion(&mut self, dimension: Dimension, value: f64) -> ClientIntent {
        self.local_vector.set(dimension, value);
        ClientIntent::IntentVectorUpdate {
            vector: self.local_vector,
        }
    }

    /// Move locally and return the intent announcing it.
    pub fn set_local_position(&mut self, position: Position) -> ClientIntent {
        self.local_position = position;
        ClientIntent::IntentPositionUpdate { position }
    }

    /// Apply one server event to the replica.
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Welcome { id, color } => {
                debug!(participant = %id, "Welcomed by server");
                self.self_id = Some(id);
                self.color = Some(color);
                self.status = ConnectionStatus::Connected;
            }
            ServerEvent::FullState(state) | ServerEvent::StateUpdated(state) => {
                self.replace(state);
            }
            ServerEvent::ParticipantJoined { participant } => self.upsert(participant),
            ServerEvent::ParticipantLeft { id, .. } => {
                self.replica.participants.retain(|p| p.id != id);
            }
            ServerEvent::PositionUpdated { id, position } => {
                if let Some(record) = self.record_mut(id) {
                    record.position = position;
                }
            }
            ServerEvent::LivenessPong { timestamp } => self.last_pong = Some(timestamp),
        }
    }

    /// The transport dropped. The next connection gets a fresh id.
    pub fn on_transport_lost(&mut self) {
        self.self_id = None;
        self.color = None;
        self.status = ConnectionStatus::Reconnecting { attempt: 1 };
    }

    /// A reconnect attempt is starting.
    pub fn on_reconnect_attempt(&mut self, attempt: u32) {
        self.status = ConnectionStatus::Reconnecting { attempt };
    }

    /// The transport is back. Returns the resync request to send; stale
    /// deltas are never replayed.
    pub fn on_transport_restored(&mut self) -> ClientIntent {
        self.status = ConnectionStatus::Connected;
        ClientIntent::RequestFullState
    }

    /// Retries are exhausted.
    pub fn on_gave_up(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    /// Own participant id, once welcomed.
    pub const fn self_id(&self) -> Option<ParticipantId> {
        self.self_id
    }

    /// Own display color, once welcomed.
    pub const fn color(&self) -> Option<&DisplayColor> {
        self.color.as_ref()
    }

    /// Last authoritative field state.
    pub const fn replica(&self) -> &SharedFieldState {
        &self.replica
    }

    /// Own vector (provisional until the next whole-state event).
    pub const fn local_vector(&self) -> EmotionalVector {
        self.local_vector
    }

    /// Own position.
    pub const fn local_position(&self) -> Position {
        self.local_position
    }

    /// Transport state.
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Server time of the most recent pong.
    pub const fn last_pong(&self) -> Option<DateTime<Utc>> {
        self.last_pong
    }

    /// Everyone in the replica except this participant.
    pub fn others(&self) -> impl Iterator<Item = &ParticipantRecord> {
        let me = self.self_id;
        self.replica
            .participants
            .iter()
            .filter(move |p| Some(p.id) != me)
    }

    fn replace(&mut self, state: SharedFieldState) {
        self.replica = state;
        if let Some(own) = self.self_id.and_then(|id| self.replica.participant(id)) {
            self.local_vector = own.emotional_vector;
        }
    }

    fn upsert(&mut self, record: ParticipantRecord) {
        let participants = &mut self.replica.participants;
        match participants.binary_search_by_key(&record.id, |p| p.id) {
            Ok(index) => {
                if let Some(slot) = participants.get_mut(index) {
                    *slot = record;
                }
            }
            Err(index) => participants.insert(index, record),
        }
    }

    fn record_mut(&mut self, id: ParticipantId) -> Option<&mut ParticipantRecord> {
        self.replica.participants.iter_mut().find(|p| p.id == id)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::float_cmp,
    clippy::indexing_slicing
)]
mod tests {
    use chrono::Utc;
    use symphony_types::LeaveReason;

    use super::*;

    fn record(id: ParticipantId, joy: f64) -> ParticipantRecord {
        let mut emotional_vector = EmotionalVector::BASELINE;
        emotional_vector.joy = joy;
        ParticipantRecord {
            id,
            emotional_vector,
            position: Position::ORIGIN,
            color: DisplayColor::from_hue(120.0),
            last_activity: Utc::now(),
        }
    }

    fn state(records: Vec<ParticipantRecord>) -> SharedFieldState {
        let mut state = SharedFieldState::empty(EmotionalVector::BASELINE, 0.5);
        state.participants = records;
        state.participants.sort_by_key(|p| p.id);
        state
    }

    fn welcomed(id: ParticipantId) -> ClientMirror {
        let mut mirror = ClientMirror::new();
        mirror.apply(ServerEvent::Welcome {
            id,
            color: DisplayColor::from_hue(10.0),
        });
        mirror
    }

    #[test]
    fn local_edit_is_immediate_and_clamped() {
        let mut mirror = ClientMirror::new();
        let intent = mirror.update_emotion(Dimension::Joy, 1.7);

        assert_eq!(mirror.local_vector().joy, 1.0);
        match intent {
            ClientIntent::IntentVectorUpdate { vector } => assert_eq!(vector.joy, 1.0),
            other => panic!("unexpected intent {other:?}"),
        }
    }

    #[test]
    fn set_local_vector_clamps_every_component() {
        let mut mirror = ClientMirror::new();
        let _ = mirror.set_local_vector(EmotionalVector::from_fn(|_| -3.0));
        assert_eq!(mirror.local_vector(), EmotionalVector::ZERO);
    }

    #[test]
    fn welcome_sets_identity_and_status() {
        let id = ParticipantId::new();
        let mirror = welcomed(id);

        assert_eq!(mirror.self_id(), Some(id));
        assert_eq!(mirror.status(), ConnectionStatus::Connected);
        assert!(mirror.color().is_some());
    }

    #[test]
    fn whole_state_overwrites_provisional_vector() {
        let me = ParticipantId::new();
        let mut mirror = welcomed(me);
        let _ = mirror.update_emotion(Dimension::Joy, 0.9);

        mirror.apply(ServerEvent::StateUpdated(state(vec![record(me, 0.25)])));

        assert_eq!(mirror.local_vector().joy, 0.25);
        assert_eq!(mirror.replica().connection_strength, 0.5);
    }

    #[test]
    fn full_state_replaces_replica_wholesale() {
        let me = ParticipantId::new();
        let stale = ParticipantId::new();
        let mut mirror = welcomed(me);
        mirror.apply(ServerEvent::ParticipantJoined {
            participant: record(stale, 0.1),
        });

        mirror.apply(ServerEvent::FullState(state(vec![record(me, 0.5)])));

        assert_eq!(mirror.replica().participants.len(), 1);
        assert!(mirror.replica().participant(stale).is_none());
    }

    #[test]
    fn join_leave_and_move() {
        let me = ParticipantId::new();
        let other = ParticipantId::new();
        let mut mirror = welcomed(me);
        mirror.apply(ServerEvent::FullState(state(vec![record(me, 0.5)])));

        mirror.apply(ServerEvent::ParticipantJoined {
            participant: record(other, 0.5),
        });
        assert_eq!(mirror.others().count(), 1);

        let moved = Position::new(1.0, 2.0, 3.0);
        mirror.apply(ServerEvent::PositionUpdated {
            id: other,
            position: moved,
        });
        assert_eq!(mirror.replica().participant(other).unwrap().position, moved);

        mirror.apply(ServerEvent::ParticipantLeft {
            id: other,
            reason: LeaveReason::TimedOut,
        });
        assert_eq!(mirror.others().count(), 0);
        assert_eq!(mirror.replica().participants.len(), 1);
    }

    #[test]
    fn joins_keep_id_order_without_duplicates() {
        let mut mirror = ClientMirror::new();
        let ids = [ParticipantId::new(), ParticipantId::new(), ParticipantId::new()];
        for id in ids.iter().rev() {
            mirror.apply(ServerEvent::ParticipantJoined {
                participant: record(*id, 0.5),
            });
        }
        mirror.apply(ServerEvent::ParticipantJoined {
            participant: record(ids[1], 0.8),
        });

        let seen: Vec<_> = mirror.replica().participants.iter().map(|p| p.id).collect();
        let mut sorted = ids.to_vec();
        sorted.sort();
        assert_eq!(seen, sorted);
        assert_eq!(
            mirror.replica().participant(ids[1]).unwrap().emotional_vector.joy,
            0.8
        );
    }

    #[test]
    fn position_for_unknown_participant_is_ignored() {
        let mut mirror = ClientMirror::new();
        mirror.apply(ServerEvent::PositionUpdated {
            id: ParticipantId::new(),
            position: Position::new(1.0, 1.0, 1.0),
        });
        assert!(mirror.replica().participants.is_empty());
    }

    #[test]
    fn reconnect_lifecycle() {
        let mut mirror = welcomed(ParticipantId::new());

        mirror.on_transport_lost();
        assert_eq!(mirror.self_id(), None);
        assert_eq!(mirror.status(), ConnectionStatus::Reconnecting { attempt: 1 });

        mirror.on_reconnect_attempt(3);
        assert_eq!(mirror.status(), ConnectionStatus::Reconnecting { attempt: 3 });

        assert_eq!(mirror.on_transport_restored(), ClientIntent::RequestFullState);
        assert_eq!(mirror.status(), ConnectionStatus::Connected);

        mirror.on_gave_up();
        assert_eq!(mirror.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn pong_records_server_time() {
        let mut mirror = ClientMirror::new();
        let now = Utc::now();
        mirror.apply(ServerEvent::LivenessPong { timestamp: now });
        assert_eq!(mirror.last_pong(), Some(now));
    }
}
