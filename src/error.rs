//! Error types shared across the crate.
//!
//! # Taxonomy
//! - `ConfigError`: configuration could not be read or is invalid (startup only)
//! - `TelemetryError`: `configure()` refused to build the telemetry stack
//! - `ExportError`: a span batch could not be delivered to the collector
//!
//! Application errors raised by request handlers are never wrapped; the
//! request span middleware observes them and hands them back untouched.

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fatal startup errors from [`crate::configure`].
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Export was requested but cannot be provided.
    #[error("span export requested but unavailable: {0}")]
    ExporterUnavailable(String),
}

/// Failure to deliver a batch to the collector.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Collector could not be reached (connect error, reset, timeout).
    #[error("collector unreachable: {0}")]
    Unreachable(String),

    /// Collector answered with a non-success status.
    #[error("collector rejected batch with status {status}")]
    Rejected { status: u16 },

    /// Batch could not be encoded.
    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ExportError {
    /// Whether sending the same batch again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExportError::Unreachable(_) => true,
            ExportError::Rejected { status } => {
                crate::resilience::retries::is_retryable_status(*status)
            }
            ExportError::Encode(_) => false,
        }
    }
}
