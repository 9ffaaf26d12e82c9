//! Request span middleware.
//!
//! Wraps every request in a server span that lives in a fresh [`Context`].
//! The context is inserted into the request extensions and scoped as the
//! task's ambient context while the inner service runs, so loggers called
//! from handlers pick up the request's ids without any plumbing.
//!
//! A request moves through `no span → span open → closed ok | closed error`:
//! - inner service returns a response: span closed (error when 5xx)
//! - inner service returns `Err`: one ERROR record, span closed as error, the
//!   error is returned unchanged
//! - inner service panics: one ERROR record, span closed as error, the panic
//!   is resumed with its original payload

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use axum::http::{Request, Response};
use futures_util::future::{BoxFuture, FutureExt};
use tower::{Layer, Service};

use crate::logging::{FieldValue, Level, LogRecord, Logger};
use crate::trace::{propagation, Context, SpanKind, SpanStatus, TracerProvider};

/// Header set by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

struct SpanState {
    tracer: TracerProvider,
    logger: Logger,
    excluded: Vec<String>,
}

impl SpanState {
    fn is_excluded(&self, path: &str) -> bool {
        self.excluded.iter().any(|p| p == path)
    }

    fn report(&self, cx: &Context, message: String, exception: String) {
        let record = LogRecord::new(Level::Error, self.logger.name(), message)
            .with_field("exception", FieldValue::Str(exception));
        self.logger.emit(record, cx);
    }
}

/// Tower layer opening a server span per request.
#[derive(Clone)]
pub struct RequestSpanLayer {
    state: Arc<SpanState>,
}

impl fmt::Debug for RequestSpanLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpanLayer")
            .field("excluded", &self.state.excluded)
            .finish_non_exhaustive()
    }
}

impl RequestSpanLayer {
    /// `logger` receives the failure records; `excluded` paths get no span.
    pub fn new(tracer: TracerProvider, logger: Logger, excluded: Vec<String>) -> Self {
        Self {
            state: Arc::new(SpanState {
                tracer,
                logger,
                excluded,
            }),
        }
    }
}

impl<S> Layer<S> for RequestSpanLayer {
    type Service = RequestSpanService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestSpanService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequestSpanService<S> {
    inner: S,
    state: Arc<SpanState>,
}

impl<S, B, ResBody> Service<Request<B>> for RequestSpanService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    B: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // The readied service is the one that must handle this request.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();

        let path = req.uri().path().to_string();
        if state.is_excluded(&path) {
            return Box::pin(inner.call(req));
        }

        let cx = Context::new();
        let remote_parent = propagation::extract(req.headers());
        let mut span = state.tracer.start_span_with_parent(
            &cx,
            format!("{} {}", req.method(), path),
            SpanKind::Server,
            remote_parent,
        );
        span.set_attribute("http.method", req.method().as_str());
        span.set_attribute(
            "http.target",
            req.uri().path_and_query().map_or(path.as_str(), |pq| pq.as_str()),
        );
        if let Some(id) = req.headers().get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
            span.set_attribute("http.request_id", id);
        }
        req.extensions_mut().insert(cx.clone());

        Box::pin(async move {
            let handled = AssertUnwindSafe(async move { inner.call(req).await }).catch_unwind();
            match cx.clone().scope(handled).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    span.set_attribute("http.status_code", status.as_u16());
                    if status.is_server_error() {
                        span.end_with_status(SpanStatus::Error(status.to_string()));
                    } else {
                        span.end_with_status(SpanStatus::Ok);
                    }
                    Ok(response)
                }
                Ok(Err(error)) => {
                    let description = error.to_string();
                    state.report(
                        &cx,
                        format!("unhandled error while serving {path}"),
                        description.clone(),
                    );
                    span.end_with_status(SpanStatus::Error(description));
                    Err(error)
                }
                Err(payload) => {
                    let description = panic_message(payload.as_ref());
                    state.report(
                        &cx,
                        format!("panic while serving {path}"),
                        description.clone(),
                    );
                    span.end_with_status(SpanStatus::Error(description));
                    panic::resume_unwind(payload)
                }
            }
        })
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
