//! Axum router construction for the field server.
//!
//! Assembles the status route and the `WebSocket` sync endpoint into a
//! single [`Router`] with CORS restricted to the configured frontend.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::server::ServerError;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- status report and current aggregate field
/// - `GET /ws` -- `WebSocket` participant session
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws_field))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy admitting exactly one browser origin.
///
/// # Errors
///
/// Returns [`ServerError::Cors`] if `origin` is not a valid header value.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ServerError> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| ServerError::Cors(format!("invalid origin {origin:?}: {e}")))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unencodable_origin() {
        assert!(cors_layer("http://localhost:3000").is_ok());
        assert!(matches!(cors_layer("bad\norigin"), Err(ServerError::Cors(_))));
    }
}
