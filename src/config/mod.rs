//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overlay: LOG_FORMAT, OTEL_*)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → configure() builds the telemetry stack from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so an empty environment is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{AppConfig, BatchConfig, LogFormat, LoggingConfig, RetryConfig, ServerConfig, TracingConfig};
