//! Trace provider: span creation, sampling and hand-off to the processor.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::export::{DiscardProcessor, SpanProcessor};
use crate::trace::context::Context;
use crate::trace::id::{SpanId, TraceId};
use crate::trace::sampler::Sampler;
use crate::trace::span::{AttributeValue, SpanContext, SpanData, SpanKind, SpanStatus};

struct ProviderInner {
    service_name: Arc<str>,
    sampler: Sampler,
    processor: Arc<dyn SpanProcessor>,
}

/// Creates spans and routes ended spans to the configured processor.
///
/// Cheap to clone; all clones share one processor.
#[derive(Clone)]
pub struct TracerProvider {
    inner: Arc<ProviderInner>,
}

impl fmt::Debug for TracerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracerProvider")
            .field("service_name", &self.inner.service_name)
            .field("sampler", &self.inner.sampler)
            .finish_non_exhaustive()
    }
}

pub struct TracerProviderBuilder {
    service_name: Arc<str>,
    sampler: Sampler,
    processor: Option<Arc<dyn SpanProcessor>>,
}

impl TracerProviderBuilder {
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn SpanProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Without a processor, ended spans are discarded.
    pub fn build(self) -> TracerProvider {
        TracerProvider {
            inner: Arc::new(ProviderInner {
                service_name: self.service_name,
                sampler: self.sampler,
                processor: self.processor.unwrap_or_else(|| Arc::new(DiscardProcessor)),
            }),
        }
    }
}

impl TracerProvider {
    pub fn builder(service_name: impl Into<Arc<str>>) -> TracerProviderBuilder {
        TracerProviderBuilder {
            service_name: service_name.into(),
            sampler: Sampler::default(),
            processor: None,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Open an internal span as a child of the ambient context's active span.
    pub fn start_span(&self, name: impl Into<String>) -> SpanHandle {
        self.start_span_in(&Context::current(), name, SpanKind::Internal)
    }

    /// Open a span in `cx`, parented on its active span.
    pub fn start_span_in(&self, cx: &Context, name: impl Into<String>, kind: SpanKind) -> SpanHandle {
        self.start_span_with_parent(cx, name, kind, None)
    }

    /// Open a span in `cx`. The context's active span wins over `remote_parent`;
    /// the remote parent is used only when the context is empty.
    pub fn start_span_with_parent(
        &self,
        cx: &Context,
        name: impl Into<String>,
        kind: SpanKind,
        remote_parent: Option<SpanContext>,
    ) -> SpanHandle {
        let parent = cx.active_span().or(remote_parent);
        let trace_id = parent.map_or_else(TraceId::random, |p| p.trace_id);
        let sampled = self.inner.sampler.should_sample(parent.as_ref(), trace_id);
        let context = SpanContext {
            trace_id,
            span_id: SpanId::random(),
            sampled,
            remote: false,
        };

        cx.push(context);

        SpanHandle {
            data: Some(SpanData {
                name: name.into(),
                context,
                parent_span_id: parent.map(|p| p.span_id),
                kind,
                service_name: self.inner.service_name.clone(),
                start_time: SystemTime::now(),
                end_time: None,
                status: SpanStatus::Unset,
                attributes: Vec::new(),
            }),
            context,
            cx: cx.clone(),
            processor: self.inner.processor.clone(),
        }
    }

    /// The active span of the ambient context.
    pub fn current_span(&self) -> Option<SpanContext> {
        Context::try_current().and_then(|cx| cx.active_span())
    }

    pub async fn force_flush(&self) {
        self.inner.processor.force_flush().await;
    }

    pub async fn shutdown(&self) {
        self.inner.processor.shutdown().await;
    }
}

/// An open span. Ending it (explicitly or by drop) pops it from its context
/// and hands the completed record to the processor.
pub struct SpanHandle {
    data: Option<SpanData>,
    context: SpanContext,
    cx: Context,
    processor: Arc<dyn SpanProcessor>,
}

impl fmt::Debug for SpanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanHandle")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl SpanHandle {
    pub fn span_context(&self) -> SpanContext {
        self.context
    }

    /// The execution context this span is active in.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        if let Some(data) = self.data.as_mut() {
            data.attributes.push((key.into(), value.into()));
        }
    }

    pub fn set_status(&mut self, status: SpanStatus) {
        if let Some(data) = self.data.as_mut() {
            data.status = status;
        }
    }

    pub fn end(mut self) {
        self.finish();
    }

    pub fn end_with_status(mut self, status: SpanStatus) {
        self.set_status(status);
        self.finish();
    }

    fn finish(&mut self) {
        let Some(mut data) = self.data.take() else {
            return;
        };
        self.cx.pop(&self.context);
        data.end_time = Some(SystemTime::now());
        if data.context.sampled {
            self.processor.on_end(data);
        }
    }
}

impl Drop for SpanHandle {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<SpanData>>);

    #[async_trait]
    impl SpanProcessor for Collect {
        fn on_end(&self, span: SpanData) {
            self.0.lock().unwrap().push(span);
        }

        async fn force_flush(&self) {}

        async fn shutdown(&self) {}
    }

    fn provider(sampler: Sampler) -> (TracerProvider, Arc<Collect>) {
        let collect = Arc::new(Collect::default());
        let provider = TracerProvider::builder("svc")
            .with_sampler(sampler)
            .with_processor(collect.clone())
            .build();
        (provider, collect)
    }

    #[test]
    fn test_nested_spans_share_trace() {
        let (provider, collect) = provider(Sampler::AlwaysOn);
        let cx = Context::new();

        let outer = provider.start_span_in(&cx, "outer", SpanKind::Server);
        let inner = provider.start_span_in(&cx, "inner", SpanKind::Internal);
        assert_eq!(cx.active_span(), Some(inner.span_context()));
        assert_eq!(inner.span_context().trace_id, outer.span_context().trace_id);

        let outer_id = outer.span_context().span_id;
        inner.end();
        assert_eq!(cx.active_span().map(|s| s.span_id), Some(outer_id));
        outer.end();
        assert!(cx.active_span().is_none());

        let spans = collect.0.lock().unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].parent_span_id, Some(outer_id));
        assert!(spans[0].end_time.is_some());
        assert_eq!(&*spans[1].service_name, "svc");
    }

    #[test]
    fn test_unsampled_span_still_correlates() {
        let (provider, collect) = provider(Sampler::AlwaysOff);
        let cx = Context::new();

        let span = provider.start_span_in(&cx, "quiet", SpanKind::Internal);
        let active = cx.active_span().unwrap();
        assert_eq!(active.span_id, span.span_context().span_id);
        assert_ne!(active.trace_id.to_u128(), 0);
        span.end();

        assert!(collect.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_closes_span() {
        let (provider, collect) = provider(Sampler::AlwaysOn);
        let cx = Context::new();
        {
            let mut span = provider.start_span_in(&cx, "scoped", SpanKind::Internal);
            span.set_attribute("job", "cleanup");
            span.set_status(SpanStatus::Error("aborted".into()));
        }
        assert!(cx.active_span().is_none());
        let spans = collect.0.lock().unwrap();
        assert_eq!(spans[0].status, SpanStatus::Error("aborted".into()));
        assert_eq!(spans[0].attribute("job"), Some(&AttributeValue::from("cleanup")));
    }

    #[test]
    fn test_remote_parent_joins_trace() {
        let (provider, collect) = provider(Sampler::ParentBasedAlwaysOn);
        let remote = SpanContext {
            trace_id: TraceId::random(),
            span_id: SpanId::random(),
            sampled: false,
            remote: true,
        };
        let cx = Context::new();
        let span = provider.start_span_with_parent(&cx, "GET /", SpanKind::Server, Some(remote));
        assert_eq!(span.span_context().trace_id, remote.trace_id);
        assert!(!span.span_context().sampled);
        span.end();
        assert!(collect.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_current_span_reads_ambient_context() {
        let (provider, _collect) = provider(Sampler::AlwaysOn);
        assert!(provider.current_span().is_none());

        let cx = Context::new();
        let span = provider.start_span_in(&cx, "request", SpanKind::Server);
        let expected = span.span_context();
        let seen = cx.clone().scope(async { provider.current_span() }).await;
        assert_eq!(seen, Some(expected));
        span.end();
    }

    #[test]
    fn test_default_build_discards() {
        let provider = TracerProvider::builder("svc").build();
        let cx = Context::new();
        let span = provider.start_span_in(&cx, "x", SpanKind::Internal);
        span.end();
        assert_eq!(provider.service_name(), "svc");
    }
}
