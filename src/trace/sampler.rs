//! Sampling decisions.
//!
//! Sampling only controls export. Unsampled spans still get real ids and are
//! still pushed on the context stack, so log correlation does not depend on
//! the sampler.

use crate::trace::id::TraceId;
use crate::trace::span::SpanContext;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Sampler {
    AlwaysOn,
    AlwaysOff,
    /// Sample a fixed fraction of traces, keyed on the trace id.
    TraceIdRatio(f64),
    /// Follow the parent's decision; `AlwaysOn` for root spans.
    #[default]
    ParentBasedAlwaysOn,
    ParentBasedAlwaysOff,
    ParentBasedTraceIdRatio(f64),
}

impl Sampler {
    /// Parse the `OTEL_TRACES_SAMPLER` name with its optional argument.
    pub fn parse(name: &str, arg: Option<&str>) -> Option<Self> {
        let ratio = || -> Option<f64> {
            match arg.map(str::trim).filter(|a| !a.is_empty()) {
                None => Some(1.0),
                Some(a) => a.parse::<f64>().ok().filter(|r| (0.0..=1.0).contains(r)),
            }
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "always_on" => Some(Sampler::AlwaysOn),
            "always_off" => Some(Sampler::AlwaysOff),
            "traceidratio" => ratio().map(Sampler::TraceIdRatio),
            "parentbased_always_on" => Some(Sampler::ParentBasedAlwaysOn),
            "parentbased_always_off" => Some(Sampler::ParentBasedAlwaysOff),
            "parentbased_traceidratio" => ratio().map(Sampler::ParentBasedTraceIdRatio),
            _ => None,
        }
    }

    /// Decide whether a new span in `trace_id` should be exported.
    pub fn should_sample(&self, parent: Option<&SpanContext>, trace_id: TraceId) -> bool {
        match self {
            Sampler::AlwaysOn => true,
            Sampler::AlwaysOff => false,
            Sampler::TraceIdRatio(ratio) => ratio_sample(*ratio, trace_id),
            Sampler::ParentBasedAlwaysOn => parent.map_or(true, |p| p.sampled),
            Sampler::ParentBasedAlwaysOff => parent.map_or(false, |p| p.sampled),
            Sampler::ParentBasedTraceIdRatio(ratio) => {
                parent.map_or_else(|| ratio_sample(*ratio, trace_id), |p| p.sampled)
            }
        }
    }
}

fn ratio_sample(ratio: f64, trace_id: TraceId) -> bool {
    let ratio = ratio.clamp(0.0, 1.0);
    let bound = (ratio * (1u64 << 63) as f64) as u64;
    let low = trace_id.to_u128() as u64;
    (low >> 1) < bound
}
