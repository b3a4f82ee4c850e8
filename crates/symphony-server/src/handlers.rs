//! REST endpoint handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Status report: participant count and current field |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use symphony_types::FieldStatus;

use crate::error::ApiError;
use crate::state::AppState;

/// Report service status and the current aggregate field.
///
/// Answers `503` when the hub event loop has stopped.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<FieldStatus>, ApiError> {
    let status = state.hub.status().await?;
    Ok(Json(status))
}
