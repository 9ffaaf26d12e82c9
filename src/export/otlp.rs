//! OTLP/HTTP exporter.
//!
//! Batches are converted into the generated OTLP protobuf messages and posted
//! to `<endpoint>/v1/traces` using the OTLP JSON mapping (hex ids, 64-bit
//! integers as decimal strings).

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{span, status, ResourceSpans, ScopeSpans, Span, Status};
use reqwest::header::CONTENT_TYPE;

use crate::error::{ExportError, TelemetryError};
use crate::export::SpanExporter;
use crate::trace::span::{AttributeValue, SpanData, SpanKind, SpanStatus};

const SCOPE_NAME: &str = env!("CARGO_PKG_NAME");
const SCOPE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the collector URL for an OTLP base endpoint.
pub fn traces_url(endpoint: &str) -> String {
    format!("{}/v1/traces", endpoint.trim().trim_end_matches('/'))
}

fn key_value(key: &str, value: any_value::Value) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue { value: Some(value) }),
    }
}

fn attribute_value(value: &AttributeValue) -> any_value::Value {
    match value {
        AttributeValue::String(s) => any_value::Value::StringValue(s.clone()),
        AttributeValue::Int(i) => any_value::Value::IntValue(*i),
        AttributeValue::Bool(b) => any_value::Value::BoolValue(*b),
        AttributeValue::Float(f) => any_value::Value::DoubleValue(*f),
    }
}

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn to_proto_span(data: &SpanData) -> Span {
    let (code, message) = match &data.status {
        SpanStatus::Unset => (status::StatusCode::Unset, String::new()),
        SpanStatus::Ok => (status::StatusCode::Ok, String::new()),
        SpanStatus::Error(message) => (status::StatusCode::Error, message.clone()),
    };
    let kind = match data.kind {
        SpanKind::Internal => span::SpanKind::Internal,
        SpanKind::Server => span::SpanKind::Server,
    };

    Span {
        trace_id: data.trace_id().to_u128().to_be_bytes().to_vec(),
        span_id: data.span_id().to_u64().to_be_bytes().to_vec(),
        parent_span_id: data
            .parent_span_id
            .map(|id| id.to_u64().to_be_bytes().to_vec())
            .unwrap_or_default(),
        flags: u32::from(data.context.sampled),
        name: data.name.clone(),
        kind: kind as i32,
        start_time_unix_nano: unix_nanos(data.start_time),
        end_time_unix_nano: unix_nanos(data.end_time.unwrap_or(data.start_time)),
        attributes: data
            .attributes
            .iter()
            .map(|(key, value)| key_value(key, attribute_value(value)))
            .collect(),
        status: Some(Status {
            message,
            code: code as i32,
        }),
        ..Default::default()
    }
}

/// Group a batch by service name into one export request.
pub fn to_export_request(batch: &[SpanData]) -> ExportTraceServiceRequest {
    let mut by_service: BTreeMap<&str, Vec<Span>> = BTreeMap::new();
    for data in batch {
        by_service
            .entry(data.service_name.as_ref())
            .or_default()
            .push(to_proto_span(data));
    }

    let resource_spans = by_service
        .into_iter()
        .map(|(service, spans)| ResourceSpans {
            resource: Some(Resource {
                attributes: vec![key_value(
                    "service.name",
                    any_value::Value::StringValue(service.to_string()),
                )],
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope {
                    name: SCOPE_NAME.to_string(),
                    version: SCOPE_VERSION.to_string(),
                    ..Default::default()
                }),
                spans,
                ..Default::default()
            }],
            ..Default::default()
        })
        .collect();

    ExportTraceServiceRequest { resource_spans }
}

/// Posts span batches to an OTLP/HTTP collector.
#[derive(Debug, Clone)]
pub struct OtlpHttpExporter {
    client: reqwest::Client,
    url: String,
}

impl OtlpHttpExporter {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TelemetryError::ExporterUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: traces_url(endpoint),
        })
    }
}

#[async_trait]
impl SpanExporter for OtlpHttpExporter {
    async fn export(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        let body = serde_json::to_vec(&to_export_request(batch))?;
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ExportError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ExportError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
