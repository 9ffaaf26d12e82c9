//! Configuration loading from disk and the environment.
//!
//! Precedence: defaults, then the optional TOML file, then environment keys.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, LogFormat};
use crate::config::validation::validate_config;
use crate::error::ConfigError;

/// Load configuration from the process environment, optionally layered over a file.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_from(path, std::env::vars())
}

/// Defaults, then the file at `path` if given, then `vars`; validated last.
pub fn load_from<I, K, V>(path: Option<&Path>, vars: I) -> Result<AppConfig, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut config = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => AppConfig::default(),
    };
    apply_env(&mut config, vars)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Boolean-ish environment value: `1`, `true`, `yes`, `on` (any case) are true.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Overlay recognized keys from `vars` onto `config`. Unknown keys are ignored.
pub fn apply_env<I, K, V>(config: &mut AppConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in vars {
        let (key, value) = (key.as_ref(), value.as_ref());
        match key {
            "LOG_FORMAT" => {
                config.logging.format = match value.trim().to_ascii_lowercase().as_str() {
                    "plain" | "" => LogFormat::Plain,
                    "json" => LogFormat::Json,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                };
            }
            "OTEL_PYTHON_LOG_LEVEL" => {
                config.logging.level =
                    value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
            }
            "OTEL_PYTHON_LOG_CORRELATION" => config.logging.plain_correlation = parse_bool(value),
            "LOG_REBIND_TARGETS" => config.logging.rebind_targets = parse_list(value),
            "OTEL_SERVICE_NAME" => config.tracing.service_name = value.trim().to_string(),
            "OTEL_EXPORTER_OTLP_ENDPOINT" => config.tracing.otlp_endpoint = value.trim().to_string(),
            "OTEL_TRACING_ENABLED" => config.tracing.enabled = parse_bool(value),
            "OTEL_TRACES_SAMPLER" => config.tracing.sampler = value.trim().to_string(),
            "OTEL_TRACES_SAMPLER_ARG" => config.tracing.sampler_arg = Some(value.trim().to_string()),
            "OTEL_EXPORTER_OTLP_TIMEOUT" => {
                config.tracing.export_timeout_ms = parse_number(key, value)?
            }
            "OTEL_EXCLUDED_URLS" => config.tracing.excluded_paths = parse_list(value),
            "OTEL_BSP_SCHEDULE_DELAY" => config.batch.schedule_delay_ms = parse_number(key, value)?,
            "OTEL_BSP_MAX_QUEUE_SIZE" => config.batch.max_queue_size = parse_number(key, value)?,
            "OTEL_BSP_MAX_EXPORT_BATCH_SIZE" => {
                config.batch.max_export_batch_size = parse_number(key, value)?
            }
            "CORRELOG_BIND_ADDRESS" => config.server.bind_address = value.trim().to_string(),
            _ => {}
        }
    }
    Ok(())
}
