//! Stamps log records with the active span of their execution context.

use std::sync::Arc;

use crate::logging::record::LogRecord;
use crate::trace::Context;

/// Attaches trace/span ids (and the service name) to outgoing records.
///
/// The active span is read from the context passed at emission time. With
/// no active span only the service name is attached.
#[derive(Debug, Clone)]
pub struct CorrelationInjector {
    service: Arc<str>,
}

impl CorrelationInjector {
    pub fn new(service: impl Into<Arc<str>>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn inject(&self, record: &mut LogRecord, cx: &Context) {
        if record.service.is_none() {
            record.service = Some(self.service.clone());
        }
        if let Some(span) = cx.active_span() {
            record.trace_id = Some(span.trace_id);
            record.span_id = Some(span.span_id);
        }
    }
}
