//! Record rendering: plain lines or single-line JSON objects.

use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use crate::config::LogFormat;
use crate::logging::record::{FieldValue, LogRecord};

/// Fixed keys of the JSON output. Extra fields never overwrite these.
pub const JSON_KEYS: [&str; 7] = ["ts", "level", "logger", "msg", "trace_id", "span_id", "service"];

/// Renders a [`LogRecord`] into one line of text. Pure; never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Formatter {
    format: LogFormat,
    plain_correlation: bool,
}

impl Formatter {
    pub fn plain() -> Self {
        Self {
            format: LogFormat::Plain,
            plain_correlation: false,
        }
    }

    pub fn json() -> Self {
        Self {
            format: LogFormat::Json,
            plain_correlation: false,
        }
    }

    pub fn new(format: LogFormat, plain_correlation: bool) -> Self {
        Self {
            format,
            plain_correlation,
        }
    }

    /// Append ` [trace_id=.. span_id=.. service=..]` to plain lines.
    pub fn with_plain_correlation(mut self, enabled: bool) -> Self {
        self.plain_correlation = enabled;
        self
    }

    pub fn format(&self, record: &LogRecord) -> String {
        match self.format {
            LogFormat::Plain => self.format_plain(record),
            LogFormat::Json => format_json(record),
        }
    }

    fn format_plain(&self, record: &LogRecord) -> String {
        let mut line = format!("{} :: {} :: {}", record.logger, record.level, record.message);
        if self.plain_correlation {
            let mut parts = Vec::with_capacity(3);
            if let Some(trace_id) = record.trace_id {
                parts.push(format!("trace_id={trace_id}"));
            }
            if let Some(span_id) = record.span_id {
                parts.push(format!("span_id={span_id}"));
            }
            if let Some(service) = &record.service {
                parts.push(format!("service={service}"));
            }
            if !parts.is_empty() {
                line.push_str(" [");
                line.push_str(&parts.join(" "));
                line.push(']');
            }
        }
        line
    }
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Str(s) => Value::String(s.clone()),
        FieldValue::I64(v) => Value::from(*v),
        FieldValue::U64(v) => Value::from(*v),
        FieldValue::F64(v) => Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(v.to_string())),
        FieldValue::Bool(v) => Value::Bool(*v),
        FieldValue::Json(v) => v.clone(),
    }
}

fn format_json(record: &LogRecord) -> String {
    let mut object = Map::new();
    object.insert(
        "ts".into(),
        Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    object.insert("level".into(), Value::String(record.level.as_str().into()));
    object.insert("logger".into(), Value::String(record.logger.to_string()));
    object.insert("msg".into(), Value::String(record.message.clone()));
    if let Some(trace_id) = record.trace_id {
        object.insert("trace_id".into(), Value::String(trace_id.to_string()));
    }
    if let Some(span_id) = record.span_id {
        object.insert("span_id".into(), Value::String(span_id.to_string()));
    }
    if let Some(service) = &record.service {
        object.insert("service".into(), Value::String(service.to_string()));
    }
    for (key, value) in &record.fields {
        if JSON_KEYS.contains(&key.as_str()) {
            continue;
        }
        object.insert(key.clone(), field_to_json(value));
    }
    // A Map of Values always serializes.
    Value::Object(object).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Level;
    use crate::trace::id::{SpanId, TraceId};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn correlated(record: LogRecord) -> LogRecord {
        LogRecord {
            trace_id: TraceId::from_u128(0x0af7651916cd43dd8448eb211c80319c),
            span_id: SpanId::from_u64(0xb7ad6b7169203331),
            service: Some(Arc::from("checkout")),
            ..record
        }
    }

    #[test]
    fn test_plain_line() {
        let record = LogRecord::new(Level::Warning, "app.db", "slow query");
        assert_eq!(Formatter::plain().format(&record), "app.db :: WARNING :: slow query");
    }

    #[test]
    fn test_plain_ignores_ids_unless_enabled() {
        let record = correlated(LogRecord::new(Level::Info, "root", "hi"));
        assert_eq!(Formatter::plain().format(&record), "root :: INFO :: hi");
        assert_eq!(
            Formatter::plain().with_plain_correlation(true).format(&record),
            "root :: INFO :: hi [trace_id=0af7651916cd43dd8448eb211c80319c span_id=b7ad6b7169203331 service=checkout]"
        );
    }

    #[test]
    fn test_json_round_trip() {
        let mut record = correlated(LogRecord::new(Level::Error, "app", "failed"));
        record.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        let line = Formatter::json().format(&record);
        let decoded: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(decoded["ts"], "2024-05-01T12:30:00.000Z");
        assert_eq!(decoded["level"], "ERROR");
        assert_eq!(decoded["logger"], "app");
        assert_eq!(decoded["msg"], "failed");
        assert_eq!(decoded["trace_id"], "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(decoded["span_id"], "b7ad6b7169203331");
        assert_eq!(decoded["service"], "checkout");
    }

    #[test]
    fn test_json_omits_absent_ids() {
        let record = LogRecord::new(Level::Info, "app", "no span");
        let decoded: serde_json::Value =
            serde_json::from_str(&Formatter::json().format(&record)).unwrap();
        let object = decoded.as_object().unwrap();
        assert!(!object.contains_key("trace_id"));
        assert!(!object.contains_key("span_id"));
        assert!(!object.contains_key("service"));
    }

    #[test]
    fn test_json_coerces_non_finite_floats() {
        let record = LogRecord::new(Level::Info, "app", "ratio")
            .with_field("ratio", f64::NAN)
            .with_field("limit", f64::INFINITY)
            .with_field("count", 3u64);
        let decoded: serde_json::Value =
            serde_json::from_str(&Formatter::json().format(&record)).unwrap();
        assert_eq!(decoded["ratio"], "NaN");
        assert_eq!(decoded["limit"], "inf");
        assert_eq!(decoded["count"], 3);
    }

    #[test]
    fn test_extra_fields_cannot_override_fixed_keys() {
        let record = LogRecord::new(Level::Info, "app", "real").with_field("msg", "spoofed");
        let decoded: serde_json::Value =
            serde_json::from_str(&Formatter::json().format(&record)).unwrap();
        assert_eq!(decoded["msg"], "real");
    }
}
