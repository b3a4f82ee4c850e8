//! Transport errors surfaced to the UI layer.

use std::time::Duration;

/// Failure to establish the server connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// A single attempt was refused or failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A single attempt did not complete in time.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// Every attempt failed. The client stays disconnected.
    #[error("gave up after {attempts} connection attempts")]
    Exhausted {
        /// How many attempts were made.
        attempts: u32,
    },
}
