//! Shared type definitions for the Symphony shared emotional field.
//!
//! This crate is the single source of truth for every type that crosses
//! the wire between the field server and its clients. Types flow to
//! `TypeScript` via `ts-rs` for the front end.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for participant identifiers
//! - [`vector`] -- The 7-dimensional [`EmotionalVector`], [`Dimension`],
//!   and [`Position`]
//! - [`structs`] -- Participant records, field snapshots, status report
//! - [`protocol`] -- [`ClientIntent`] and [`ServerEvent`] wire enums

pub mod ids;
pub mod protocol;
pub mod structs;
pub mod vector;

// Re-export all public types at crate root for convenience.
pub use ids::ParticipantId;
pub use protocol::{ClientIntent, LeaveReason, ServerEvent};
pub use structs::{DisplayColor, FieldStatus, ParticipantRecord, SharedFieldState};
pub use vector::{Dimension, EmotionalVector, Position, clamp_unit};
