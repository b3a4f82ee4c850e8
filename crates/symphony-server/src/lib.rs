//! HTTP and `WebSocket` surface for the Symphony shared emotional field.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) where each socket is one
//!   participant exchanging JSON intents and events with the hub
//! - **Status endpoint** (`/health`) reporting the participant count
//!   and the current aggregate field
//!
//! # Architecture
//!
//! All field state lives inside the hub task from `symphony-core`.
//! Handlers hold only a [`HubHandle`](symphony_core::HubHandle) and
//! talk to the hub through its command queue, so socket tasks never
//! touch shared state directly.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::{build_router, cors_layer};
pub use server::{ServerError, start_server};
pub use state::AppState;
