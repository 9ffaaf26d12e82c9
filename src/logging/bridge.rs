//! `tracing` → registry bridge.
//!
//! Third-party crates (hyper, tower-http, axum) and this crate's own internals
//! log through `tracing`. Installing [`RegistryLayer`] in the global subscriber
//! turns those events into [`LogRecord`]s under a dotted logger name derived
//! from the event target (`tower_http::trace` → `tower_http.trace`), so they
//! resolve through the same bindings, formats and correlation as application
//! logs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{self, Layer};

use crate::logging::correlation::CorrelationInjector;
use crate::logging::record::{FieldValue, LogRecord};
use crate::logging::registry::HandlerRegistry;
use crate::logging::Level;
use crate::trace::Context;

/// Logger name for a `tracing` target.
pub fn logger_name(target: &str) -> String {
    target.replace("::", ".")
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, FieldValue>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: FieldValue) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, FieldValue::Str(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, FieldValue::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, FieldValue::U64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, FieldValue::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, FieldValue::Bool(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, FieldValue::Str(format!("{value:?}")));
    }
}

/// Subscriber layer forwarding `tracing` events into a [`HandlerRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryLayer {
    registry: Arc<HandlerRegistry>,
    injector: CorrelationInjector,
}

impl RegistryLayer {
    pub fn new(registry: Arc<HandlerRegistry>, injector: CorrelationInjector) -> Self {
        Self { registry, injector }
    }
}

impl<S: Subscriber> Layer<S> for RegistryLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from_tracing(metadata.level());
        let logger = logger_name(metadata.target());
        if !self.registry.is_enabled(&logger, level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::new(level, logger, visitor.message.unwrap_or_default());
        record.fields = visitor.fields;
        self.injector.inject(&mut record, &Context::current());
        self.registry.dispatch(&record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::sink::MemorySink;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_logger_name_from_target() {
        assert_eq!(logger_name("tower_http::trace::on_response"), "tower_http.trace.on_response");
        assert_eq!(logger_name("hyper"), "hyper");
    }

    #[test]
    fn test_events_reach_rebound_sink() {
        let root = MemorySink::new();
        let hyper_sink = MemorySink::new();
        let registry = Arc::new(HandlerRegistry::with_root(Arc::new(root.clone()), Level::Info));
        registry.bind("hyper", Arc::new(hyper_sink.clone()), Level::Debug, false);

        let layer = RegistryLayer::new(registry, CorrelationInjector::new("svc"));
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "hyper::proto::h1", bytes = 42u64, "flushed");
            tracing::warn!(target: "app::db", retry = true, "slow");
            tracing::debug!(target: "app::db", "filtered out");
        });

        let hyper_records = hyper_sink.records();
        assert_eq!(hyper_records.len(), 1);
        assert_eq!(&*hyper_records[0].logger, "hyper.proto.h1");
        assert_eq!(hyper_records[0].message, "flushed");
        assert_eq!(hyper_records[0].field("bytes"), Some(&FieldValue::U64(42)));

        let root_records = root.records();
        assert_eq!(root_records.len(), 1);
        assert_eq!(root_records[0].level, Level::Warning);
        assert_eq!(root_records[0].field("retry"), Some(&FieldValue::Bool(true)));
        assert!(root_records[0].trace_id.is_none());
    }
}
