//! Error types for the HTTP surface.
//!
//! [`ApiError`] converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use symphony_core::HubError;

/// Errors that can occur while serving HTTP requests.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The hub event loop is not running.
    #[error("field unavailable: {0}")]
    Unavailable(String),
}

impl From<HubError> for ApiError {
    fn from(e: HubError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
