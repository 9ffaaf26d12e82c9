//! Per-request execution context holding the active-span stack.
//!
//! # Design
//! - One `Context` is created per inbound request; clones share the same stack.
//! - The context travels explicitly (request extensions, function arguments)
//!   and is also installed as the task's ambient context with [`Context::scope`]
//!   so the plain `logger.info(..)` API can find it at emission time.
//! - Two requests never share a `Context`, so their stacks are disjoint.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::trace::span::SpanContext;

tokio::task_local! {
    static CURRENT_CONTEXT: Context;
}

/// Execution context for one logical unit of work (usually one request).
#[derive(Debug, Clone, Default)]
pub struct Context {
    stack: Arc<Mutex<Vec<SpanContext>>>,
}

impl Context {
    /// Create an empty context with no active span.
    pub fn new() -> Self {
        Self::default()
    }

    /// The context installed for the current task, if any.
    pub fn try_current() -> Option<Self> {
        CURRENT_CONTEXT.try_with(Clone::clone).ok()
    }

    /// The context installed for the current task, or an empty one.
    pub fn current() -> Self {
        Self::try_current().unwrap_or_default()
    }

    /// The innermost open span in this context.
    pub fn active_span(&self) -> Option<SpanContext> {
        self.stack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .copied()
    }

    /// Number of open spans.
    pub fn depth(&self) -> usize {
        self.stack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn push(&self, span: SpanContext) {
        self.stack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span);
    }

    /// Remove `span` from the stack. Handles closed out of order are removed
    /// from wherever they sit.
    pub(crate) fn pop(&self, span: &SpanContext) {
        let mut stack = self.stack.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = stack.iter().rposition(|open| open.span_id == span.span_id) {
            stack.remove(pos);
        }
    }

    /// Run `fut` with this context as the task's ambient context.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT_CONTEXT.scope(self, fut).await
    }

    /// Synchronous counterpart of [`Context::scope`].
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT_CONTEXT.sync_scope(self, f)
    }
}
