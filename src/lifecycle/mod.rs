//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     AppConfig → sinks + registry → trace provider → export pipeline → Telemetry
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain requests → flush spans → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: logging first, so tracing setup can already log
//! - Fail fast: a configuration error is fatal
//! - Pending spans are flushed before the process exits

pub mod shutdown;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{configure, configure_with_sink, Telemetry};
