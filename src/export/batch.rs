//! Batching span processor.
//!
//! # Responsibilities
//! - Queue ended spans without blocking the request path
//! - Flush on a timer and whenever a full batch is waiting
//! - Retry failed exports with backoff, then drop with one diagnostic
//!
//! # Design Decisions
//! - The queue mutex is only held to push or drain, never across an await
//! - Flushes are serialized, so `force_flush` also waits for a worker export
//!   already in flight
//! - A full queue drops new spans instead of applying backpressure
//! - The worker performs a final flush when shutdown is triggered

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::BatchConfig;
use crate::error::ExportError;
use crate::export::{SpanExporter, SpanProcessor};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::logging::{FieldValue, Level, LogRecord, Logger};
use crate::resilience::retries::RetryPolicy;
use crate::trace::span::SpanData;
use crate::trace::Context;

struct Shared {
    queue: Mutex<Vec<SpanData>>,
    notify: Notify,
    flush_lock: AsyncMutex<()>,
    exporter: Arc<dyn SpanExporter>,
    config: BatchConfig,
    retry: RetryPolicy,
    export_timeout: Duration,
    diagnostics: Logger,
    dropped: AtomicU64,
    exported: AtomicU64,
}

impl Shared {
    fn take_batch(&self) -> Vec<SpanData> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let n = queue.len().min(self.config.max_export_batch_size);
        queue.drain(..n).collect()
    }

    async fn export_pending(&self) {
        let _flushing = self.flush_lock.lock().await;
        loop {
            let batch = self.take_batch();
            if batch.is_empty() {
                break;
            }
            self.export_batch(batch).await;
        }
    }

    async fn export_batch(&self, batch: Vec<SpanData>) {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let error = match time::timeout(self.export_timeout, self.exporter.export(&batch)).await {
                Ok(Ok(())) => {
                    self.exported.fetch_add(batch.len() as u64, Ordering::Relaxed);
                    metrics::counter!("correlog_spans_exported_total").increment(batch.len() as u64);
                    return;
                }
                Ok(Err(error)) => error,
                Err(_) => ExportError::Unreachable(format!(
                    "export timed out after {:?}",
                    self.export_timeout
                )),
            };

            match self.retry.next_delay(attempts, &error) {
                Some(delay) => {
                    tracing::debug!(
                        attempt = attempts,
                        delay = ?delay,
                        error = %error,
                        "Span export failed, retrying"
                    );
                    time::sleep(delay).await;
                }
                None => {
                    self.drop_batch(&batch, attempts, &error);
                    return;
                }
            }
        }
    }

    fn drop_batch(&self, batch: &[SpanData], attempts: u32, error: &ExportError) {
        let spans = batch.len() as u64;
        self.dropped.fetch_add(spans, Ordering::Relaxed);
        metrics::counter!("correlog_spans_dropped_total", "reason" => "export_failed")
            .increment(spans);

        let record = LogRecord::new(
            Level::Warning,
            self.diagnostics.name(),
            format!("Dropping {spans} spans after {attempts} export attempt(s): {error}"),
        )
        .with_field("spans", FieldValue::U64(spans))
        .with_field("attempts", FieldValue::U64(u64::from(attempts)))
        .with_field("error", error.to_string());
        // Diagnostics belong to no request.
        self.diagnostics.emit(record, &Context::new());
    }
}

/// Queues ended spans and exports them from a background task.
pub struct BatchSpanProcessor {
    shared: Arc<Shared>,
    shutdown: Shutdown,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchSpanProcessor {
    /// Start the processor. Must be called from within a Tokio runtime.
    pub fn spawn(
        exporter: Arc<dyn SpanExporter>,
        config: BatchConfig,
        retry: RetryPolicy,
        export_timeout: Duration,
        diagnostics: Logger,
    ) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Vec::with_capacity(config.max_export_batch_size)),
            notify: Notify::new(),
            flush_lock: AsyncMutex::new(()),
            exporter,
            config,
            retry,
            export_timeout,
            diagnostics,
            dropped: AtomicU64::new(0),
            exported: AtomicU64::new(0),
        });
        let shutdown = Shutdown::new();
        let worker = tokio::spawn(run(shared.clone(), shutdown.subscribe()));

        Self {
            shared,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Spans dropped so far, from a full queue or failed exports.
    pub fn dropped_spans(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Spans delivered to the collector so far.
    pub fn exported_spans(&self) -> u64 {
        self.shared.exported.load(Ordering::Relaxed)
    }

    /// Spans waiting for the next flush.
    pub fn queued_spans(&self) -> usize {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

async fn run(shared: Arc<Shared>, mut signal: ShutdownSignal) {
    let mut ticker = time::interval(Duration::from_millis(shared.config.schedule_delay_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    tracing::debug!(
        schedule_delay_ms = shared.config.schedule_delay_ms,
        max_export_batch_size = shared.config.max_export_batch_size,
        "Batch span processor started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => shared.export_pending().await,
            _ = shared.notify.notified() => shared.export_pending().await,
            _ = signal.wait() => {
                shared.export_pending().await;
                break;
            }
        }
    }

    tracing::debug!("Batch span processor stopped");
}

#[async_trait]
impl SpanProcessor for BatchSpanProcessor {
    fn on_end(&self, span: SpanData) {
        let queued = {
            let mut queue = self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner);
            if queue.len() >= self.shared.config.max_queue_size {
                None
            } else {
                queue.push(span);
                Some(queue.len())
            }
        };

        match queued {
            Some(len) if len >= self.shared.config.max_export_batch_size => {
                self.shared.notify.notify_one();
            }
            Some(_) => {}
            None => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("correlog_spans_dropped_total", "reason" => "queue_full")
                    .increment(1);
            }
        }
    }

    async fn force_flush(&self) {
        self.shared.export_pending().await;
    }

    async fn shutdown(&self) {
        self.shutdown.trigger();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
        // Spans that ended while the worker was exiting.
        self.shared.export_pending().await;
    }
}

impl Drop for BatchSpanProcessor {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
