//! Startup: builds the telemetry stack from configuration.
//!
//! # Order
//! 1. Validate the configuration
//! 2. Formatter and root sink, then the handler registry (root plus the
//!    rebound third-party targets)
//! 3. Sampler and span processor (batching exporter or discard)
//! 4. Trace provider

use std::sync::Arc;

use crate::config::validation::validate_config;
use crate::config::AppConfig;
use crate::error::{ConfigError, TelemetryError};
use crate::export::{DiscardProcessor, SpanProcessor};
use crate::http::middleware::{panic_message, RequestSpanLayer};
use crate::logging::{
    CorrelationInjector, FieldValue, Formatter, HandlerRegistry, Level, LogRecord, Logger,
    RegistryLayer, Sink, StreamSink, ROOT,
};
use crate::trace::{Context, Sampler, TracerProvider};

/// Logger name for the crate's own export diagnostics.
pub const EXPORT_LOGGER: &str = "correlog.export";

/// Logger name for panics outside a traced request.
pub const PANIC_LOGGER: &str = "correlog.panic";

/// Handle to the configured logging and tracing stack.
#[derive(Debug, Clone)]
pub struct Telemetry {
    config: Arc<AppConfig>,
    registry: Arc<HandlerRegistry>,
    injector: CorrelationInjector,
    tracer: TracerProvider,
}

impl Telemetry {
    /// A logger bound to `name`. Use [`ROOT`] for the root logger.
    pub fn logger(&self, name: &str) -> Logger {
        Logger::new(name, self.registry.clone(), self.injector.clone())
    }

    pub fn tracer(&self) -> &TracerProvider {
        &self.tracer
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Middleware opening a span per request. Failures are reported on the
    /// root logger.
    pub fn request_span_layer(&self) -> RequestSpanLayer {
        RequestSpanLayer::new(
            self.tracer.clone(),
            self.logger(ROOT),
            self.config.tracing.excluded_paths.clone(),
        )
    }

    /// Subscriber layer routing `tracing` events through the registry.
    pub fn bridge_layer(&self) -> RegistryLayer {
        RegistryLayer::new(self.registry.clone(), self.injector.clone())
    }

    /// Route panics through the registry instead of the default stderr hook.
    ///
    /// Panics inside a traced request are skipped here; the request span
    /// middleware reports them with the request's ids.
    pub fn install_panic_hook(&self) {
        let logger = self.logger(PANIC_LOGGER);
        std::panic::set_hook(Box::new(move |info| {
            let location = info.location().map(ToString::to_string);
            report_panic(&logger, &panic_message(info.payload()), location);
        }));
    }

    /// Flush pending spans and stop the export task.
    pub async fn shutdown(&self) {
        self.tracer.shutdown().await;
    }
}

fn report_panic(logger: &Logger, message: &str, location: Option<String>) {
    if Context::try_current().is_some_and(|cx| cx.active_span().is_some()) {
        return;
    }
    let mut record = LogRecord::new(Level::Critical, logger.name(), format!("panic: {message}"));
    if let Some(location) = location {
        record = record.with_field("location", FieldValue::Str(location));
    }
    logger.emit(record, &Context::new());
}

/// Build the telemetry stack, logging to stdout.
pub fn configure(config: &AppConfig) -> Result<Telemetry, TelemetryError> {
    let formatter = Formatter::new(config.logging.format, config.logging.plain_correlation);
    configure_with_sink(config, Arc::new(StreamSink::stdout(formatter)))
}

/// Build the telemetry stack with `sink` as the root (and rebound) sink.
///
/// When export is enabled this spawns the batch task and must run inside a
/// Tokio runtime.
pub fn configure_with_sink(
    config: &AppConfig,
    sink: Arc<dyn Sink>,
) -> Result<Telemetry, TelemetryError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let level = config.logging.level;
    let registry = Arc::new(HandlerRegistry::with_root(sink.clone(), level));
    for target in &config.logging.rebind_targets {
        registry.bind(target, sink.clone(), level, false);
    }

    let service_name: Arc<str> = Arc::from(config.tracing.service_name.as_str());
    // `tracing.enabled` gates export only; correlation is always on.
    let injector = CorrelationInjector::new(service_name.clone());

    let sampler = Sampler::parse(&config.tracing.sampler, config.tracing.sampler_arg.as_deref())
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "tracing.sampler".to_string(),
            value: config.tracing.sampler.clone(),
        })?;

    let diagnostics = Logger::new(EXPORT_LOGGER, registry.clone(), injector.clone());
    let processor = build_processor(config, diagnostics)?;

    let tracer = TracerProvider::builder(service_name)
        .with_sampler(sampler)
        .with_processor(processor)
        .build();

    Ok(Telemetry {
        config: Arc::new(config.clone()),
        registry,
        injector,
        tracer,
    })
}

#[cfg(feature = "otlp")]
fn build_processor(
    config: &AppConfig,
    diagnostics: Logger,
) -> Result<Arc<dyn SpanProcessor>, TelemetryError> {
    use std::time::Duration;

    use crate::export::{BatchSpanProcessor, OtlpHttpExporter};
    use crate::resilience::retries::RetryPolicy;

    if !config.tracing.export_enabled() {
        return Ok(Arc::new(DiscardProcessor));
    }

    let timeout = Duration::from_millis(config.tracing.export_timeout_ms);
    let exporter = OtlpHttpExporter::new(&config.tracing.otlp_endpoint, timeout)?;

    Ok(Arc::new(BatchSpanProcessor::spawn(
        Arc::new(exporter),
        config.batch.clone(),
        RetryPolicy::new(&config.retries),
        timeout,
        diagnostics,
    )))
}

#[cfg(not(feature = "otlp"))]
fn build_processor(
    config: &AppConfig,
    _diagnostics: Logger,
) -> Result<Arc<dyn SpanProcessor>, TelemetryError> {
    if config.tracing.export_enabled() {
        return Err(TelemetryError::ExporterUnavailable(
            "built without the `otlp` feature".to_string(),
        ));
    }
    Ok(Arc::new(DiscardProcessor))
}
