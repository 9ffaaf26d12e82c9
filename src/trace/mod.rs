//! Distributed tracing support.
//!
//! # Responsibilities
//! - Generate trace and span identifiers
//! - Track the active span per execution context
//! - Decide sampling and hand ended spans to the export pipeline
//! - Extract W3C trace context from incoming requests
//!
//! # Design Decisions
//! - The active-span stack lives in an explicit `Context`, one per request
//! - Spans always get real ids, even when unsampled or export is off, so log
//!   correlation behaves the same with or without a collector

pub mod context;
pub mod id;
pub mod propagation;
pub mod provider;
pub mod sampler;
pub mod span;

pub use context::Context;
pub use id::{SpanId, TraceId};
pub use provider::{SpanHandle, TracerProvider, TracerProviderBuilder};
pub use sampler::Sampler;
pub use span::{AttributeValue, SpanContext, SpanData, SpanKind, SpanStatus};
