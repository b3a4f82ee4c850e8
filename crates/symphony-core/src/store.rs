//! The single authoritative table of connected participants.
//!
//! [`StateStore`] owns every [`ParticipantRecord`] plus the derived field
//! values. All mutation goes through its methods; callers hold ids, never
//! references into the table, and read through [`StateStore::snapshot`].

use std::collections::BTreeMap;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use symphony_types::{
    DisplayColor, EmotionalVector, ParticipantId, ParticipantRecord, Position, SharedFieldState,
};
use tracing::debug;

use crate::aggregation::{AggregationEngine, FieldAggregate};
use crate::config::FieldConfig;

/// Errors returned by store mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A record already exists for this id.
    #[error("participant {0} is already present")]
    AlreadyPresent(ParticipantId),

    /// No record exists for this id, typically because the participant
    /// disconnected while the message was in flight.
    #[error("participant {0} not found")]
    NotFound(ParticipantId),
}

/// Authoritative shared field state.
#[derive(Debug)]
pub struct StateStore {
    participants: BTreeMap<ParticipantId, ParticipantRecord>,
    derived: FieldAggregate,
    rng: StdRng,
}

impl StateStore {
    /// Create an empty store whose field starts at `baseline`.
    pub fn new(baseline: EmotionalVector, baseline_connection_strength: f64) -> Self {
        Self::with_rng(baseline, baseline_connection_strength, StdRng::from_os_rng())
    }

    /// Create an empty store with an explicit color source.
    pub fn with_rng(
        baseline: EmotionalVector,
        baseline_connection_strength: f64,
        rng: StdRng,
    ) -> Self {
        Self {
            participants: BTreeMap::new(),
            derived: FieldAggregate {
                aggregate_field: baseline.clamped(),
                connection_strength: symphony_types::clamp_unit(baseline_connection_strength),
            },
            rng,
        }
    }

    /// Create an empty store from the `field` configuration section.
    pub fn from_config(config: &FieldConfig) -> Self {
        Self::new(config.baseline, config.baseline_connection_strength)
    }

    /// Insert a record for a newly connected participant.
    ///
    /// The record starts at the origin with the current aggregate field as
    /// its vector, so the aggregate does not move.
    pub fn add_participant(&mut self, id: ParticipantId) -> Result<ParticipantRecord, StoreError> {
        if self.participants.contains_key(&id) {
            return Err(StoreError::AlreadyPresent(id));
        }
        let hue: f64 = self.rng.random_range(0.0..360.0);
        let record = ParticipantRecord {
            id,
            emotional_vector: self.derived.aggregate_field,
            position: Position::ORIGIN,
            color: DisplayColor::from_hue(hue),
            last_activity: Utc::now(),
        };
        self.participants.insert(id, record.clone());
        Ok(record)
    }

    /// Remove a participant. Returns whether a record was removed; calling
    /// it again for the same id is a no-op.
    pub fn remove_participant(&mut self, id: ParticipantId) -> bool {
        if self.participants.remove(&id).is_none() {
            return false;
        }
        self.derived = AggregationEngine::recompute(&self.participants, None, self.derived);
        true
    }

    /// Store a clamped vector for `id` and recompute the derived values.
    ///
    /// Returns the vector as stored.
    pub fn update_vector(
        &mut self,
        id: ParticipantId,
        vector: EmotionalVector,
    ) -> Result<EmotionalVector, StoreError> {
        let record = self
            .participants
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        let stored = vector.clamped();
        if !vector.is_in_range() {
            debug!(participant = %id, "Clamped out-of-range vector components");
        }
        record.emotional_vector = stored;
        record.last_activity = Utc::now();
        self.derived = AggregationEngine::recompute(&self.participants, Some(id), self.derived);
        Ok(stored)
    }

    /// Store a new position for `id`. Positions do not feed aggregation.
    pub fn update_position(
        &mut self,
        id: ParticipantId,
        position: Position,
    ) -> Result<(), StoreError> {
        let record = self
            .participants
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        record.position = position;
        record.last_activity = Utc::now();
        Ok(())
    }

    /// Stamp activity for `id` without changing anything else.
    pub fn touch(&mut self, id: ParticipantId) -> Result<(), StoreError> {
        let record = self
            .participants
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        record.last_activity = Utc::now();
        Ok(())
    }

    /// An owned copy of the whole field, participants ordered by id.
    pub fn snapshot(&self) -> SharedFieldState {
        SharedFieldState {
            participants: self.participants.values().cloned().collect(),
            aggregate_field: self.derived.aggregate_field,
            connection_strength: self.derived.connection_strength,
        }
    }

    /// Read-only view of one record.
    pub fn participant(&self, id: ParticipantId) -> Option<&ParticipantRecord> {
        self.participants.get(&id)
    }

    /// Whether `id` has a record.
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the store has no participants.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Current aggregate field.
    pub const fn aggregate_field(&self) -> EmotionalVector {
        self.derived.aggregate_field
    }

    /// Current connection strength.
    pub const fn connection_strength(&self) -> f64 {
        self.derived.connection_strength
    }
}
