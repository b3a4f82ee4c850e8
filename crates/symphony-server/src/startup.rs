//! Process wiring: hub event loop plus HTTP server.

use std::sync::Arc;

use symphony_core::{Hub, SymphonyConfig};
use tracing::{error, warn};

use crate::router::{build_router, cors_layer};
use crate::server::{ServerError, start_server};
use crate::state::AppState;

/// Run the field server until shutdown.
///
/// Spawns the hub on its own task, serves HTTP and `WebSocket` traffic,
/// and once the server stops asks the hub to finish and waits for it.
///
/// # Errors
///
/// Returns [`ServerError`] if the CORS origin is invalid or the server
/// cannot bind or serve.
pub async fn run(config: SymphonyConfig) -> Result<(), ServerError> {
    let cors = cors_layer(&config.server.allowed_origin)?;

    let (hub, task) = Hub::from_config(&config).spawn(config.hub.command_capacity);

    let state = Arc::new(AppState::new(hub.clone()));
    let result = start_server(&config.server, build_router(state, cors)).await;

    if let Err(e) = hub.shutdown().await {
        warn!(error = %e, "Hub already stopped");
    }
    if let Err(e) = task.await {
        error!(error = %e, "Hub task failed");
    }
    result
}
