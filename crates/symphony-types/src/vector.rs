//! The 7-dimensional emotional vector and 3D positions.
//!
//! Every component of an [`EmotionalVector`] lives in the closed interval
//! `[0, 1]`. Client-supplied values are clamped, never rejected, so any
//! vector that reaches the store or the wire is in range.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One named axis of an [`EmotionalVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Dimension {
    /// Joy.
    Joy,
    /// Excitement.
    Excitement,
    /// Calm.
    Calm,
    /// Curiosity.
    Curiosity,
    /// Emotional intensity.
    Intensity,
    /// Fluidity of movement.
    Fluidity,
    /// Felt connection with others.
    Connection,
}

impl Dimension {
    /// All seven dimensions in canonical order.
    pub const ALL: [Self; 7] = [
        Self::Joy,
        Self::Excitement,
        Self::Calm,
        Self::Curiosity,
        Self::Intensity,
        Self::Fluidity,
        Self::Connection,
    ];

    /// Wire name of the dimension.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Joy => "joy",
            Self::Excitement => "excitement",
            Self::Calm => "calm",
            Self::Curiosity => "curiosity",
            Self::Intensity => "intensity",
            Self::Fluidity => "fluidity",
            Self::Connection => "connection",
        }
    }
}

impl core::fmt::Display for Dimension {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Clamp a single component into `[0, 1]`.
///
/// `NaN` maps to `0.0`; infinities saturate at the nearest bound.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A participant's emotional state across seven named dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EmotionalVector {
    /// Joy, in `[0, 1]`.
    pub joy: f64,
    /// Excitement, in `[0, 1]`.
    pub excitement: f64,
    /// Calm, in `[0, 1]`.
    pub calm: f64,
    /// Curiosity, in `[0, 1]`.
    pub curiosity: f64,
    /// Intensity, in `[0, 1]`.
    pub intensity: f64,
    /// Fluidity, in `[0, 1]`.
    pub fluidity: f64,
    /// Connection, in `[0, 1]`.
    pub connection: f64,
}

impl EmotionalVector {
    /// The field every fresh process starts from.
    pub const BASELINE: Self = Self {
        joy: 0.5,
        excitement: 0.3,
        calm: 0.7,
        curiosity: 0.6,
        intensity: 0.4,
        fluidity: 0.5,
        connection: 0.2,
    };

    /// A vector with every component set to zero.
    pub const ZERO: Self = Self {
        joy: 0.0,
        excitement: 0.0,
        calm: 0.0,
        curiosity: 0.0,
        intensity: 0.0,
        fluidity: 0.0,
        connection: 0.0,
    };

    /// Build a vector by evaluating `f` for each dimension. The result is
    /// not clamped.
    pub fn from_fn(mut f: impl FnMut(Dimension) -> f64) -> Self {
        Self {
            joy: f(Dimension::Joy),
            excitement: f(Dimension::Excitement),
            calm: f(Dimension::Calm),
            curiosity: f(Dimension::Curiosity),
            intensity: f(Dimension::Intensity),
            fluidity: f(Dimension::Fluidity),
            connection: f(Dimension::Connection),
        }
    }

    /// Read one component.
    pub const fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Joy => self.joy,
            Dimension::Excitement => self.excitement,
            Dimension::Calm => self.calm,
            Dimension::Curiosity => self.curiosity,
            Dimension::Intensity => self.intensity,
            Dimension::Fluidity => self.fluidity,
            Dimension::Connection => self.connection,
        }
    }

    /// Overwrite one component, clamping it into range.
    pub fn set(&mut self, dimension: Dimension, value: f64) {
        let value = clamp_unit(value);
        match dimension {
            Dimension::Joy => self.joy = value,
            Dimension::Excitement => self.excitement = value,
            Dimension::Calm => self.calm = value,
            Dimension::Curiosity => self.curiosity = value,
            Dimension::Intensity => self.intensity = value,
            Dimension::Fluidity => self.fluidity = value,
            Dimension::Connection => self.connection = value,
        }
    }

    /// Return a copy with every component clamped into `[0, 1]`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self::from_fn(|d| clamp_unit(self.get(d)))
    }

    /// Whether every component already lies in `[0, 1]`.
    pub fn is_in_range(&self) -> bool {
        Dimension::ALL
            .iter()
            .all(|d| (0.0..=1.0).contains(&self.get(*d)))
    }
}

impl Default for EmotionalVector {
    fn default() -> Self {
        Self::BASELINE
    }
}

/// A point in the shared 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct Position(pub [f64; 3]);

impl Position {
    /// The origin, where every participant starts.
    pub const ORIGIN: Self = Self([0.0, 0.0, 0.0]);

    /// Build a position from its coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn clamped_pulls_components_into_range() {
        let raw = EmotionalVector {
            joy: 1.5,
            excitement: -0.2,
            calm: f64::NAN,
            curiosity: f64::INFINITY,
            ..EmotionalVector::BASELINE
        };
        let v = raw.clamped();
        assert_eq!(v.joy, 1.0);
        assert_eq!(v.excitement, 0.0);
        assert_eq!(v.calm, 0.0);
        assert_eq!(v.curiosity, 1.0);
        assert_eq!(v.intensity, 0.4);
        assert!(v.is_in_range());
        assert!(!raw.is_in_range());
    }

    #[test]
    fn set_clamps_single_component() {
        let mut v = EmotionalVector::ZERO;
        v.set(Dimension::Fluidity, 3.0);
        assert_eq!(v.get(Dimension::Fluidity), 1.0);
        assert_eq!(v.get(Dimension::Joy), 0.0);
    }

    #[test]
    fn vector_uses_named_wire_fields() {
        let json = serde_json::to_value(EmotionalVector::BASELINE).unwrap();
        assert_eq!(json["calm"], 0.7);
        assert_eq!(json["connection"], 0.2);
    }

    #[test]
    fn position_is_a_bare_triple_on_the_wire() {
        let p: Position = serde_json::from_str("[1.0, -2.5, 3.0]").unwrap();
        assert_eq!(p, Position::new(1.0, -2.5, 3.0));
        assert_eq!(serde_json::to_string(&Position::ORIGIN).unwrap(), "[0.0,0.0,0.0]");
    }

    #[test]
    fn dimension_names_match_serde() {
        for d in Dimension::ALL {
            let json = serde_json::to_string(&d).unwrap();
            assert_eq!(json, format!("\"{}\"", d.name()));
        }
    }
}
