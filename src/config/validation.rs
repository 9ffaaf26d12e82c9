//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use url::Url;

use crate::config::schema::AppConfig;
use crate::trace::Sampler;

/// One semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.tracing.service_name.trim().is_empty() {
        errors.push(ValidationError::new("tracing.service_name", "must not be empty"));
    }

    let endpoint = config.tracing.otlp_endpoint.trim();
    if !endpoint.is_empty() {
        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "tracing.otlp_endpoint",
                format!("unsupported scheme {:?}", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "tracing.otlp_endpoint",
                format!("invalid URL: {e}"),
            )),
        }
    }

    if Sampler::parse(&config.tracing.sampler, config.tracing.sampler_arg.as_deref()).is_none() {
        errors.push(ValidationError::new(
            "tracing.sampler",
            format!("unknown sampler or bad argument {:?}", config.tracing.sampler),
        ));
    }

    if config.tracing.export_timeout_ms == 0 {
        errors.push(ValidationError::new("tracing.export_timeout_ms", "must be greater than zero"));
    }

    if config.batch.max_queue_size == 0 {
        errors.push(ValidationError::new("batch.max_queue_size", "must be greater than zero"));
    }
    if config.batch.max_export_batch_size == 0 {
        errors.push(ValidationError::new(
            "batch.max_export_batch_size",
            "must be greater than zero",
        ));
    } else if config.batch.max_export_batch_size > config.batch.max_queue_size {
        errors.push(ValidationError::new(
            "batch.max_export_batch_size",
            "must not exceed batch.max_queue_size",
        ));
    }
    if config.batch.schedule_delay_ms == 0 {
        errors.push(ValidationError::new("batch.schedule_delay_ms", "must be greater than zero"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.logging.rebind_targets.iter().any(|t| t.trim().is_empty() || t == "root") {
        errors.push(ValidationError::new(
            "logging.rebind_targets",
            "targets must be non-empty and must not name the root logger",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.tracing.service_name = " ".into();
        config.tracing.otlp_endpoint = "ftp://collector".into();
        config.batch.max_queue_size = 10;
        config.batch.max_export_batch_size = 20;
        config.retries.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "tracing.service_name",
                "tracing.otlp_endpoint",
                "batch.max_export_batch_size",
                "retries.max_attempts",
            ]
        );
    }

    #[test]
    fn test_rejects_bad_sampler_argument() {
        let mut config = AppConfig::default();
        config.tracing.sampler = "traceidratio".into();
        config.tracing.sampler_arg = Some("1.5".into());
        assert!(validate_config(&config).is_err());
    }
}
