//! Symphony field server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$SYMPHONY_CONFIG` (default
//!    `symphony-config.yaml`), falling back to defaults
//! 2. Initialize structured logging (tracing)
//! 3. Spawn the hub and serve until `Ctrl-C`

use std::path::PathBuf;

use symphony_core::SymphonyConfig;
use symphony_server::startup;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "symphony-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var("SYMPHONY_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = SymphonyConfig::load(&path)?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        config = %path.display(),
        host = %config.server.host,
        port = config.server.port,
        "symphony-server starting"
    );

    startup::run(config).await?;

    info!("symphony-server exited cleanly");
    Ok(())
}
