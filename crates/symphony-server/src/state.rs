//! Shared application state for the field server.
//!
//! [`AppState`] carries the [`HubHandle`] every request handler and
//! `WebSocket` session uses to reach the event loop. The field itself is
//! never held here; it lives inside the hub task.

use symphony_core::HubHandle;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Sender side of the hub event loop.
    pub hub: HubHandle,
}

impl AppState {
    /// Create application state around a running hub.
    pub const fn new(hub: HubHandle) -> Self {
        Self { hub }
    }
}
