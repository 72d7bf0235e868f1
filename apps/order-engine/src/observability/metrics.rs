//! Prometheus metrics for the order engine.
//!
//! Counts command invocations, retries and outcomes per call reason, and
//! position-level operations per outcome. Recording is a no-op until a
//! recorder is installed, so library users that skip [`init_metrics`]
//! pay nothing.
//!
//! # Example
//!
//! ```ignore
//! use order_engine::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config)?;
//!
//! record_command_invocation("close");
//! ```

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for command durations (in seconds).
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // Command durations from 1ms to 60s (retries included)
            duration_buckets: vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.duration_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Command Metrics
// ============================================================================

/// Record one invocation of a venue action.
///
/// # Arguments
///
/// * `reason` - Call reason (e.g., "close", "merge")
pub fn record_command_invocation(reason: &str) {
    counter!(
        "command_invocations_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a retry scheduled after a reject.
pub fn record_command_retry(reason: &str) {
    counter!(
        "command_retries_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record the terminal outcome of a command.
///
/// # Arguments
///
/// * `reason` - Call reason
/// * `outcome` - "done", "skipped", "cancelled" or an error reason string
/// * `duration_seconds` - Time from activation to termination
pub fn record_command_outcome(reason: &str, outcome: &str, duration_seconds: f64) {
    counter!(
        "command_outcomes_total",
        "reason" => reason.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        "command_duration_seconds",
        "reason" => reason.to_string()
    )
    .record(duration_seconds);
}

// ============================================================================
// Position Metrics
// ============================================================================

/// Record a position-level operation.
///
/// # Arguments
///
/// * `operation` - "submit", "merge" or "close"
/// * `outcome` - e.g. "merged", "closed", "busy", "no_eligible_orders", "failed"
pub fn record_position_operation(operation: &str, outcome: &str) {
    counter!(
        "position_operations_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
