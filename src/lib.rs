//! Log/trace correlation for HTTP services.
//!
//! Every log record emitted while a request is being served carries the
//! trace and span ids of that request. Spans are batched and exported to an
//! OTLP/HTTP collector when one is configured.

pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod resilience;
pub mod trace;

pub use config::AppConfig;
pub use error::{ConfigError, ExportError, TelemetryError};
pub use http::HttpServer;
pub use lifecycle::{configure, configure_with_sink, Shutdown, Telemetry};
pub use logging::{Level, Logger};
pub use trace::{Context, TracerProvider};
