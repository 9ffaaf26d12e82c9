//! Structured logging with trace correlation.
//!
//! # Data Flow
//! ```text
//! logger("app").info(msg)            tracing::info!(..) in any crate
//!     → logger.rs                        → bridge.rs (RegistryLayer)
//!         ↘                            ↙
//!           correlation.rs (stamp active trace_id / span_id)
//!           → registry.rs (walk name lineage, check levels)
//!           → sink.rs (StreamSink → formatter.rs → stdout)
//! ```
//!
//! # Design Decisions
//! - The registry is an explicit object, built once by `configure()`
//! - Correlation reads the context at emission time, never at logger creation
//! - Logging never fails the caller: sink errors are swallowed

pub mod bridge;
pub mod correlation;
pub mod formatter;
pub mod level;
pub mod logger;
pub mod record;
pub mod registry;
pub mod sink;

pub use bridge::RegistryLayer;
pub use correlation::CorrelationInjector;
pub use formatter::Formatter;
pub use level::Level;
pub use logger::Logger;
pub use record::{FieldValue, LogRecord};
pub use registry::{HandlerBinding, HandlerRegistry, ROOT};
pub use sink::{MemorySink, Sink, StreamSink};
