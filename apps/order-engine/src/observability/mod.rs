//! Observability module for metrics.
//!
//! Command and position instrumentation exported through Prometheus.
//! Logging and trace export live in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_command_invocation, record_command_outcome,
    record_command_retry, record_position_operation,
};
