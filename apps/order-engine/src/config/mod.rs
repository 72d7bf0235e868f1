//! Configuration module for the order engine.
//!
//! Loads YAML configuration with environment variable interpolation and
//! validates it after parsing. Every section has defaults, so an empty
//! document is a valid configuration.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("retries: {}", config.execution.retry_attempts);
//! ```

mod execution;
mod feed;
mod observability;
mod position;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use execution::ExecutionConfig;
pub use feed::FeedConfig;
pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use position::PositionConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Command execution defaults.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Outcome feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Position configuration.
    #[serde(default)]
    pub position: PositionConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.feed.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "feed.capacity must be positive".to_string(),
        ));
    }

    if config.position.notification_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "position.notification_capacity must be positive".to_string(),
        ));
    }

    if config.execution.retry_attempts > 0 && config.execution.retry_delay_ms == 0 {
        tracing::warn!("execution.retry_delay_ms is 0, rejected calls will be retried immediately");
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    let level = config.observability.logging.level.to_lowercase();
    if !valid_levels.contains(&level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.level must be one of: {valid_levels:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::application::ports::{DEFAULT_FEED_CAPACITY, ExecutionContext};

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.execution.retry_attempts, 0);
        assert_eq!(config.execution.retry_delay_ms, 500);
        assert_eq!(config.execution.context, ExecutionContext::Blocking);
        assert_eq!(config.feed.capacity, DEFAULT_FEED_CAPACITY);
        assert_eq!(config.position.sweep_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.observability.logging.level, "info");
        assert!(!config.observability.metrics.enabled);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = match load_config_from_string("") {
            Ok(c) => c,
            Err(e) => panic!("empty config should load: {e}"),
        };
        assert_eq!(config.feed.capacity, DEFAULT_FEED_CAPACITY);
    }

    #[test]
    fn test_load_minimal_config() {
        let yaml = r"
execution:
  retry_attempts: 2
";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };
        assert_eq!(config.execution.retry_attempts, 2);
        assert_eq!(
            config.execution.retry_policy().delay,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "level: ${ORDER_ENGINE_CONFIG_TEST_NONEXISTENT_VAR:-debug}";
        let result = interpolate_env_vars(input);

        assert_eq!(result, "level: debug");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);

        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "level: ${ORDER_ENGINE_CONFIG_TEST_UNLIKELY_TO_EXIST}";
        let result = interpolate_env_vars(input);

        assert_eq!(result, "level: ");
    }

    #[test]
    fn test_validation_zero_feed_capacity() {
        let yaml = r"
feed:
  capacity: 0
";

        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero capacity");
        };
        assert!(err.to_string().contains("feed.capacity"));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let yaml = r"
observability:
  logging:
    level: loud
";

        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for invalid level");
        };
        assert!(err.to_string().contains("level"));
    }

    #[test]
    fn test_zero_sweep_interval_disables_sweeper() {
        let yaml = r"
position:
  sweep_interval_ms: 0
";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load: {e}"),
        };
        assert_eq!(config.position.sweep_interval(), None);
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
execution:
  retry_attempts: 3
  retry_delay_ms: 250
  context: inline

feed:
  capacity: 4096

position:
  sweep_interval_ms: 1000
  notification_capacity: 16

observability:
  logging:
    level: "debug"
  metrics:
    enabled: true
    listen_addr: "127.0.0.1:9100"
"#;

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };

        assert_eq!(config.execution.retry_attempts, 3);
        assert_eq!(config.execution.retry_delay_ms, 250);
        assert_eq!(config.execution.context, ExecutionContext::Inline);
        assert_eq!(config.feed.capacity, 4096);
        assert_eq!(config.position.sweep_interval(), Some(Duration::from_secs(1)));
        assert_eq!(config.position.notification_capacity, 16);
        assert_eq!(config.observability.logging.level, "debug");
        assert!(config.observability.metrics.enabled);
        assert_eq!(
            config.observability.metrics.listen_addr.to_string(),
            "127.0.0.1:9100"
        );
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => panic!("temp file: {e}"),
        };
        writeln!(file, "execution:\n  retry_attempts: 1").unwrap();

        let path = file.path().to_str().unwrap();
        let config = load_config(Some(path)).unwrap();

        assert_eq!(config.execution.retry_attempts, 1);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = load_config(Some("/nonexistent/order-engine.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
