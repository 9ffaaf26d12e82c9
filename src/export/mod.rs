//! Span export pipeline.
//!
//! # Data Flow
//! ```text
//! SpanHandle::end()
//!     → SpanProcessor::on_end (synchronous, never blocks)
//!         → DiscardProcessor: span dropped (export disabled)
//!         → BatchSpanProcessor: appended to the pending batch
//!             → background task (timer or size threshold)
//!             → SpanExporter::export, retried with backoff
//!             → dropped with one diagnostic after the last attempt
//! ```
//!
//! # Design Decisions
//! - The exporter is a capability trait chosen once at startup
//! - Only the background task performs network I/O
//! - Export failures are never surfaced to request handlers

pub mod batch;
#[cfg(feature = "otlp")]
pub mod otlp;

use async_trait::async_trait;

use crate::error::ExportError;
use crate::trace::span::SpanData;

pub use batch::BatchSpanProcessor;
#[cfg(feature = "otlp")]
pub use otlp::OtlpHttpExporter;

/// Delivers completed spans to a collector.
#[async_trait]
pub trait SpanExporter: Send + Sync + 'static {
    async fn export(&self, batch: &[SpanData]) -> Result<(), ExportError>;
}

/// Receives spans as they end.
#[async_trait]
pub trait SpanProcessor: Send + Sync + 'static {
    /// Called synchronously when a span ends. Must not block.
    fn on_end(&self, span: SpanData);

    /// Export everything queued so far.
    async fn force_flush(&self);

    /// Flush and stop background work.
    async fn shutdown(&self);
}

/// Processor used when export is disabled: spans keep valid ids for
/// correlation but are dropped on close.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardProcessor;

#[async_trait]
impl SpanProcessor for DiscardProcessor {
    fn on_end(&self, _span: SpanData) {}

    async fn force_flush(&self) {}

    async fn shutdown(&self) {}
}
