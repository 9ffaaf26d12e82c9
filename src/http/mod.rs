//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, panic recovery)
//!     → middleware.rs (server span, ambient context)
//!     → routes.rs (sample handlers logging through the registry)
//!     → Send to client
//! ```

pub mod middleware;
pub mod routes;
pub mod server;

pub use middleware::{RequestSpanLayer, RequestSpanService, X_REQUEST_ID};
pub use server::HttpServer;
