//! Named logger front-end.

use std::fmt;
use std::sync::Arc;

use crate::logging::correlation::CorrelationInjector;
use crate::logging::record::{FieldValue, LogRecord};
use crate::logging::registry::HandlerRegistry;
use crate::logging::Level;
use crate::trace::Context;

/// A named handle for emitting records through a [`HandlerRegistry`].
///
/// The level methods read the task's ambient [`Context`] when the record is
/// emitted, not when the logger is created, so one logger can be shared by
/// every request.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    registry: Arc<HandlerRegistry>,
    injector: CorrelationInjector,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Logger {
    pub fn new(
        name: impl Into<Arc<str>>,
        registry: Arc<HandlerRegistry>,
        injector: CorrelationInjector,
    ) -> Self {
        Self {
            name: name.into(),
            registry,
            injector,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message);
    }

    /// Emit using the task's ambient context.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.log_with_fields(level, message, std::iter::empty::<(String, FieldValue)>());
    }

    /// Emit with extra fields using the task's ambient context.
    pub fn log_with_fields<I, K>(&self, level: Level, message: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        if !self.registry.is_enabled(&self.name, level) {
            return;
        }
        let record = self.build(level, message, fields);
        self.dispatch(record, &Context::current());
    }

    /// Emit against an explicit context.
    pub fn log_in(&self, cx: &Context, level: Level, message: impl Into<String>) {
        if !self.registry.is_enabled(&self.name, level) {
            return;
        }
        let record = self.build(level, message, std::iter::empty::<(String, FieldValue)>());
        self.dispatch(record, cx);
    }

    /// Inject correlation into a prepared record and hand it to the registry.
    pub fn emit(&self, record: LogRecord, cx: &Context) {
        if self.registry.is_enabled(&record.logger, record.level) {
            self.dispatch(record, cx);
        }
    }

    fn build<I, K>(&self, level: Level, message: impl Into<String>, fields: I) -> LogRecord
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        let mut record = LogRecord::new(level, self.name.clone(), message);
        record
            .fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v)));
        record
    }

    fn dispatch(&self, mut record: LogRecord, cx: &Context) {
        self.injector.inject(&mut record, cx);
        self.registry.dispatch(&record);
    }
}
