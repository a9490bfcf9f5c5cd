//! Logging setup for programs that declare environments.
//!
//! The library itself only emits `tracing` events. Programs that want to see
//! them call [`init_logging`] once at startup.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed
    #[error("Telemetry initialization failed: {reason}")]
    InitializationFailed { reason: String },

    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
    pub with_target: bool,
    pub with_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            with_target: false,
            with_file: false,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }

    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    pub fn with_file(mut self, with_file: bool) -> Self {
        self.with_file = with_file;
        self
    }

    /// Filter from `RUST_LOG`, falling back to the configured level
    pub fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.log_level).map_err(|e| {
                TelemetryError::InvalidFilter {
                    filter: self.log_level.clone(),
                    reason: e.to_string(),
                }
            }),
        }
    }
}

/// Install a global `fmt` subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(config.env_filter()?)
        .with_target(config.with_target)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .finish();

    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        TelemetryError::InitializationFailed {
            reason: format!("Failed to set tracing subscriber: {}", e),
        }
    })
}
