//! Recomputation of the derived field values.
//!
//! Two values are derived from the participant table: the aggregate field
//! (component-wise mean over every participant) and the connection
//! strength (how closely the participant who just changed resembles
//! everyone else).
//!
//! Connection strength compares only [`SIMILARITY_DIMENSIONS`]. Intensity,
//! fluidity, and connection are excluded from the similarity measure.

use std::collections::BTreeMap;

use symphony_types::{Dimension, EmotionalVector, ParticipantId, ParticipantRecord, clamp_unit};

use crate::vector_math::{cosine_similarity, mean};

/// The reduced dimension set used for pairwise similarity.
pub const SIMILARITY_DIMENSIONS: [Dimension; 4] = [
    Dimension::Joy,
    Dimension::Excitement,
    Dimension::Calm,
    Dimension::Curiosity,
];

/// Derived values of the shared field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldAggregate {
    /// Component-wise mean of all participant vectors.
    pub aggregate_field: EmotionalVector,
    /// Mean similarity between the last source and every other
    /// participant, in `[0, 1]`.
    pub connection_strength: f64,
}

/// Stateless recompute over a participant table.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    /// Recompute both derived values.
    ///
    /// `source` is the participant whose vector just changed, or `None`
    /// when the trigger was a removal. Values that cannot be computed keep
    /// their `previous` value, except that an empty table resets the
    /// connection strength to zero.
    pub fn recompute(
        participants: &BTreeMap<ParticipantId, ParticipantRecord>,
        source: Option<ParticipantId>,
        previous: FieldAggregate,
    ) -> FieldAggregate {
        if participants.is_empty() {
            return FieldAggregate {
                aggregate_field: previous.aggregate_field,
                connection_strength: 0.0,
            };
        }

        let aggregate_field = mean(participants.values().map(|p| &p.emotional_vector))
            .unwrap_or(previous.aggregate_field);

        let connection_strength = source
            .and_then(|id| Self::connection_strength(participants, id))
            .unwrap_or(previous.connection_strength);

        FieldAggregate {
            aggregate_field,
            connection_strength,
        }
    }

    /// Mean [`SIMILARITY_DIMENSIONS`] cosine similarity between `source`
    /// and every other participant.
    ///
    /// Returns `None` when `source` is unknown or has nobody to compare
    /// against.
    pub fn connection_strength(
        participants: &BTreeMap<ParticipantId, ParticipantRecord>,
        source: ParticipantId,
    ) -> Option<f64> {
        let origin = participants.get(&source)?;
        let mut total = 0.0;
        let mut others: u32 = 0;
        for (id, other) in participants {
            if *id == source {
                continue;
            }
            total += cosine_similarity(
                &origin.emotional_vector,
                &other.emotional_vector,
                &SIMILARITY_DIMENSIONS,
            );
            others = others.saturating_add(1);
        }
        if others == 0 {
            return None;
        }
        Some(clamp_unit(total / f64::from(others)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use symphony_types::{DisplayColor, Position};

    use super::*;

    fn record(vector: EmotionalVector) -> ParticipantRecord {
        ParticipantRecord {
            id: ParticipantId::new(),
            emotional_vector: vector,
            position: Position::ORIGIN,
            color: DisplayColor::from_hue(0.0),
            last_activity: Utc::now(),
        }
    }

    fn table(vectors: &[EmotionalVector]) -> BTreeMap<ParticipantId, ParticipantRecord> {
        vectors
            .iter()
            .map(|v| {
                let r = record(*v);
                (r.id, r)
            })
            .collect()
    }

    const PREVIOUS: FieldAggregate = FieldAggregate {
        aggregate_field: EmotionalVector::BASELINE,
        connection_strength: 0.3,
    };

    #[test]
    fn identical_joy_vectors_have_full_strength() {
        let joy = EmotionalVector { joy: 1.0, ..EmotionalVector::ZERO };
        let t = table(&[joy, joy]);
        let source = *t.keys().next().unwrap();
        let result = AggregationEngine::recompute(&t, Some(source), PREVIOUS);
        assert!((result.connection_strength - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_participant_is_the_aggregate() {
        let v = EmotionalVector {
            joy: 0.9,
            excitement: 0.1,
            calm: 0.25,
            curiosity: 0.75,
            intensity: 0.6,
            fluidity: 0.05,
            connection: 1.0,
        };
        let t = table(&[v]);
        let source = *t.keys().next().unwrap();
        let result = AggregationEngine::recompute(&t, Some(source), PREVIOUS);
        assert_eq!(result.aggregate_field, v);
        // Nobody to compare against.
        assert!((result.connection_strength - 0.3).abs() < 1e-12);
    }

    #[test]
    fn empty_table_keeps_field_and_zeroes_strength() {
        let result = AggregationEngine::recompute(&BTreeMap::new(), None, PREVIOUS);
        assert_eq!(result.aggregate_field, EmotionalVector::BASELINE);
        assert!(result.connection_strength.abs() < 1e-12);
    }

    #[test]
    fn removal_recomputes_field_but_keeps_strength() {
        let t = table(&[EmotionalVector::ZERO, EmotionalVector::from_fn(|_| 1.0)]);
        let result = AggregationEngine::recompute(&t, None, PREVIOUS);
        assert!((result.aggregate_field.joy - 0.5).abs() < 1e-9);
        assert!((result.connection_strength - 0.3).abs() < 1e-12);
    }

    #[test]
    fn strength_excludes_the_source_itself() {
        let joy = EmotionalVector { joy: 1.0, ..EmotionalVector::ZERO };
        let calm = EmotionalVector { calm: 1.0, ..EmotionalVector::ZERO };
        let t = table(&[joy, calm]);
        let source = *t.keys().next().unwrap();
        let strength = AggregationEngine::connection_strength(&t, source).unwrap();
        // Orthogonal over the subset; counting the source would give 0.5.
        assert!(strength.abs() < 1e-9);
    }

    #[test]
    fn strength_ignores_excluded_dimensions() {
        let a = EmotionalVector { joy: 0.8, intensity: 1.0, ..EmotionalVector::ZERO };
        let b = EmotionalVector { joy: 0.4, connection: 1.0, ..EmotionalVector::ZERO };
        let t = table(&[a, b]);
        let source = *t.keys().next().unwrap();
        let strength = AggregationEngine::connection_strength(&t, source).unwrap();
        assert!((strength - 1.0).abs() < 1e-9);
    }

    #[test]
    fn strength_stays_in_unit_interval() {
        let vectors: Vec<EmotionalVector> = (0..12)
            .map(|i| {
                let f = f64::from(i) / 11.0;
                EmotionalVector::from_fn(|d| {
                    let k = f64::from(d as u8);
                    ((f * 7.0 + k * 0.37).sin() + 1.0) / 2.0
                })
            })
            .collect();
        let t = table(&vectors);
        for id in t.keys() {
            let s = AggregationEngine::connection_strength(&t, *id).unwrap();
            assert!((0.0..=1.0).contains(&s), "strength {s} out of range");
        }
    }
}
