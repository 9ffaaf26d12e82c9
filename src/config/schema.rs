//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file; the
//! environment overlay in `loader.rs` writes into the same structs.

use serde::{Deserialize, Serialize};

use crate::logging::Level;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Log output settings.
    pub logging: LoggingConfig,

    /// Trace provider and exporter settings.
    pub tracing: TracingConfig,

    /// Batch span processor settings.
    pub batch: BatchConfig,

    /// Export retry settings.
    pub retries: RetryConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Output format of the root sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `<logger> :: <LEVEL> :: <message>`
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,

    /// Minimum severity of the root binding.
    pub level: Level,

    /// Append trace/span ids to plain lines.
    pub plain_correlation: bool,

    /// Third-party logger names forced onto the root sink without propagation.
    pub rebind_targets: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Plain,
            level: Level::Info,
            plain_correlation: false,
            rebind_targets: vec![
                "hyper".to_string(),
                "tower_http".to_string(),
                "axum".to_string(),
            ],
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Gate for span export. Spans are created either way.
    pub enabled: bool,

    /// Logical service name recorded on spans and log records.
    pub service_name: String,

    /// OTLP/HTTP base endpoint. Empty disables export.
    pub otlp_endpoint: String,

    /// Sampler name (`always_on`, `parentbased_traceidratio`, ...).
    pub sampler: String,

    /// Sampler argument (ratio for the ratio samplers).
    pub sampler_arg: Option<String>,

    /// Per-request collector timeout in milliseconds.
    pub export_timeout_ms: u64,

    /// Request paths that never get a span.
    pub excluded_paths: Vec<String>,
}

impl TracingConfig {
    /// Whether spans should leave the process.
    pub fn export_enabled(&self) -> bool {
        self.enabled && !self.otlp_endpoint.trim().is_empty()
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "correlog-samples".to_string(),
            otlp_endpoint: String::new(),
            sampler: "parentbased_always_on".to_string(),
            sampler_arg: None,
            export_timeout_ms: 10_000,
            excluded_paths: vec![
                "/metrics".to_string(),
                "/healthcheck".to_string(),
                "/healthz".to_string(),
            ],
        }
    }
}

/// Batch span processor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Spans held in memory before new ones are dropped.
    pub max_queue_size: usize,

    /// Spans per export request; reaching it triggers an early flush.
    pub max_export_batch_size: usize,

    /// Flush interval in milliseconds.
    pub schedule_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            schedule_delay_ms: 5000,
        }
    }
}

/// Retry configuration for span export.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per batch, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}
