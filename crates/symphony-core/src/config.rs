//! Configuration loading and typed config structures for the field server.
//!
//! The canonical configuration lives in `symphony-config.yaml` at the
//! project root. Every section and key has a default, so a missing file
//! or a partial file yields the designed values. A handful of deployment
//! settings can be overridden from the environment.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use symphony_types::EmotionalVector;

use crate::liveness::LivenessPolicy;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    Env {
        /// The environment variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A value is out of its permitted range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level field server configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SymphonyConfig {
    /// Listener and origin settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Liveness sweep settings.
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Initial field values.
    #[serde(default)]
    pub field: FieldConfig,

    /// Event loop queue sizes.
    #[serde(default)]
    pub hub: HubConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SymphonyConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or a validation
    /// error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_with_env(&contents, |key| std::env::var(key).ok())
    }

    /// Load from `path` when it exists, otherwise start from defaults.
    /// Environment overrides apply either way.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_with_env(yaml, |_| None)
    }

    /// Parse configuration from a YAML string, reading overrides through
    /// `lookup`.
    pub fn parse_with_env<F>(yaml: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Override deployment settings from the environment:
    /// - `HOST` overrides `server.host`
    /// - `PORT` overrides `server.port`
    /// - `FRONTEND_ORIGIN` overrides `server.allowed_origin`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_parse| ConfigError::Env { key: "PORT", value: port.clone() })?;
        }
        if let Some(origin) = lookup("FRONTEND_ORIGIN") {
            self.server.allowed_origin = origin;
        }
        Ok(())
    }

    /// Check ranges that would otherwise fail at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.liveness.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "liveness.sweep_interval_ms must be positive",
            )));
        }
        if self.liveness.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "liveness.idle_timeout_ms must be positive",
            )));
        }
        if self.hub.command_capacity == 0 || self.hub.outbound_capacity == 0 {
            return Err(ConfigError::Invalid(String::from(
                "hub queue capacities must be positive",
            )));
        }
        if !(0.0..=1.0).contains(&self.field.baseline_connection_strength) {
            return Err(ConfigError::Invalid(String::from(
                "field.baseline_connection_strength must lie in [0, 1]",
            )));
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The single front-end origin allowed by CORS.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

/// Liveness sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LivenessConfig {
    /// Milliseconds between sweeps.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Milliseconds of silence before eviction.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl LivenessConfig {
    /// The runtime policy for these settings.
    pub const fn policy(&self) -> LivenessPolicy {
        LivenessPolicy {
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

/// Initial values of the shared field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldConfig {
    /// Aggregate field before anyone has connected.
    #[serde(default = "default_baseline")]
    pub baseline: EmotionalVector,

    /// Connection strength before any comparison has run.
    #[serde(default = "default_baseline_connection_strength")]
    pub baseline_connection_strength: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            baseline_connection_strength: default_baseline_connection_strength(),
        }
    }
}

/// Event loop queue sizes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Capacity of the single inbound command queue.
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,

    /// Capacity of each connection's outbound queue.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_capacity: default_command_capacity(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error), used when
    /// `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (required by serde `default = "..."`)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    5000
}

fn default_allowed_origin() -> String {
    String::from("http://localhost:3000")
}

const fn default_sweep_interval_ms() -> u64 {
    15_000
}

const fn default_idle_timeout_ms() -> u64 {
    30_000
}

const fn default_baseline() -> EmotionalVector {
    EmotionalVector::BASELINE
}

const fn default_baseline_connection_strength() -> f64 {
    0.3
}

const fn default_command_capacity() -> usize {
    1024
}

const fn default_outbound_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_designed_values() {
        let config = SymphonyConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.allowed_origin, "http://localhost:3000");
        assert_eq!(config.liveness.policy(), LivenessPolicy::default());
        assert_eq!(config.field.baseline, EmotionalVector::BASELINE);
        assert_eq!(config.field.baseline_connection_strength, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
server:
  host: 127.0.0.1
  port: 6001
  allowed_origin: https://field.example
liveness:
  sweep_interval_ms: 1000
  idle_timeout_ms: 2500
field:
  baseline:
    joy: 0.1
    excitement: 0.2
    calm: 0.3
    curiosity: 0.4
    intensity: 0.5
    fluidity: 0.6
    connection: 0.7
  baseline_connection_strength: 0.5
hub:
  command_capacity: 64
  outbound_capacity: 16
logging:
  level: debug
";
        let config = SymphonyConfig::parse(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 6001);
        assert_eq!(config.liveness.policy().idle_timeout, Duration::from_millis(2500));
        assert_eq!(config.field.baseline.connection, 0.7);
        assert_eq!(config.hub.outbound_capacity, 16);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config = SymphonyConfig::parse("server:\n  port: 7000\n").unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.liveness.sweep_interval_ms, 15_000);
    }

    #[test]
    fn env_overrides_deployment_settings() {
        let config = SymphonyConfig::parse_with_env("{}", |key| match key {
            "PORT" => Some(String::from("8123")),
            "FRONTEND_ORIGIN" => Some(String::from("https://app.example")),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.server.allowed_origin, "https://app.example");
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let result = SymphonyConfig::parse_with_env("{}", |key| {
            (key == "PORT").then(|| String::from("not-a-port"))
        });
        assert!(matches!(result, Err(ConfigError::Env { key: "PORT", .. })));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let result = SymphonyConfig::parse("liveness:\n  sweep_interval_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(
            SymphonyConfig::parse("server: [unterminated"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn shipped_config_file_matches_defaults() {
        let shipped = SymphonyConfig::parse(include_str!("../../../symphony-config.yaml")).unwrap();
        assert_eq!(shipped, SymphonyConfig::default());
    }
}
