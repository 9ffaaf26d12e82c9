//! Log sinks: destinations for records admitted by the registry.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::logging::formatter::Formatter;
use crate::logging::record::LogRecord;

/// A destination for log records.
///
/// `emit` is called on the request path and must not block on network I/O
/// or panic. Write errors are swallowed: logging never fails the caller.
pub trait Sink: Send + Sync + 'static {
    fn emit(&self, record: &LogRecord);
}

/// Formats records and writes one line per record to a byte stream.
pub struct StreamSink {
    formatter: Formatter,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StreamSink {
    pub fn new(formatter: Formatter, writer: impl Write + Send + 'static) -> Self {
        Self {
            formatter,
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout(formatter: Formatter) -> Self {
        Self::new(formatter, io::stdout())
    }
}

impl fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink")
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}

impl Sink for StreamSink {
    fn emit(&self, record: &LogRecord) {
        let mut line = self.formatter.format(record);
        line.push('\n');
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// Keeps records in memory. Useful for tests and for inspecting what a
/// binding received.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Sink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
