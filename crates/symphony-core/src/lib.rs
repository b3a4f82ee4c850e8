//! Authoritative state engine for the Symphony shared emotional field.
//!
//! This crate owns everything with real invariants: the participant
//! table, the derived aggregate, liveness eviction, and the fan-out that
//! keeps every client replica consistent.
//!
//! # Modules
//!
//! - [`vector_math`] -- Component-wise mean and subset cosine similarity.
//! - [`aggregation`] -- Recomputes the aggregate field and connection
//!   strength from the participant table.
//! - [`store`] -- [`StateStore`], the single owner of participant records.
//! - [`liveness`] -- [`ConnectionManager`] lifecycle and idle sweep.
//! - [`broadcast`] -- Audience selection and non-blocking delivery.
//! - [`hub`] -- The single-threaded event loop and its [`HubHandle`].
//! - [`config`] -- Configuration loading from `symphony-config.yaml`.
//!
//! [`StateStore`]: store::StateStore
//! [`ConnectionManager`]: liveness::ConnectionManager
//! [`HubHandle`]: hub::HubHandle

pub mod aggregation;
pub mod broadcast;
pub mod config;
pub mod hub;
pub mod liveness;
pub mod store;
pub mod vector_math;

pub use config::SymphonyConfig;
pub use hub::{Hub, HubError, HubHandle, Session};
pub use store::{StateStore, StoreError};
