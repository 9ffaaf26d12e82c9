//! W3C Trace Context (`traceparent`) extraction.

use axum::http::HeaderMap;

use crate::trace::id::{SpanId, TraceId};
use crate::trace::span::SpanContext;

pub const TRACEPARENT: &str = "traceparent";

/// Parse a `traceparent` value: `{version}-{trace-id}-{parent-id}-{flags}`.
///
/// Returns `None` for malformed values, version `ff`, or all-zero ids.
pub fn parse_traceparent(value: &str) -> Option<SpanContext> {
    let mut parts = value.trim().split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let span_id = parts.next()?;
    let flags = parts.next()?;

    if version.len() != 2 || version.eq_ignore_ascii_case("ff") {
        return None;
    }
    let version = u8::from_str_radix(version, 16).ok()?;
    // Version 00 has exactly four fields; later versions may append more.
    if version == 0 && parts.next().is_some() {
        return None;
    }
    if flags.len() != 2 {
        return None;
    }
    let flags = u8::from_str_radix(flags, 16).ok()?;

    Some(SpanContext {
        trace_id: TraceId::from_hex(trace_id)?,
        span_id: SpanId::from_hex(span_id)?,
        sampled: flags & 0x01 == 0x01,
        remote: true,
    })
}

/// Extract a remote parent from request headers.
pub fn extract(headers: &HeaderMap) -> Option<SpanContext> {
    headers
        .get(TRACEPARENT)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_traceparent)
}
