//! OpenTelemetry Tracing Setup
//!
//! Initializes console logging and, unless disabled, an OTLP span exporter.
//!
//! # Configuration
//!
//! - `RUST_LOG`: Log filter (falls back to the configured level)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint (default: `http://localhost:4317`)
//! - `OTEL_ENABLED`: Set to `false` to disable OTEL tracing (uses console only)
//! - `OTEL_SERVICE_NAME`: Service name for traces (default: `order-engine`)
//! - `LOG_FORMAT`: Set to `pretty` for colored output without targets
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::telemetry::init_telemetry;
//!
//! #[tokio::main]
//! async fn main() {
//!     let _guard = init_telemetry("info");
//!     // ... application code
//! }
//! ```

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Guard that shuts down the tracer provider on drop.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Returns true if spans are exported over OTLP.
    #[must_use]
    pub const fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        let Some(provider) = self.provider.take() else {
            return;
        };
        if let Err(e) = provider.shutdown() {
            eprintln!("Error shutting down tracer provider: {e:?}");
        }
    }
}

/// Initialize logging and OpenTelemetry tracing.
///
/// `default_level` applies when `RUST_LOG` is unset. Returns a guard that
/// shuts down the tracer provider when dropped.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
#[must_use]
pub fn init_telemetry(default_level: &str) -> TelemetryGuard {
    let otel_enabled = std::env::var("OTEL_ENABLED")
        .map(|v| v != "false")
        .unwrap_or(true);

    let pretty = std::env::var("LOG_FORMAT")
        .map(|v| v == "pretty")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if !otel_enabled {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(!pretty)
            .with_ansi(pretty)
            .init();

        tracing::info!("OpenTelemetry disabled (OTEL_ENABLED=false), using console logging only");
        return TelemetryGuard { provider: None };
    }

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "order-engine".to_string());

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()
    {
        Ok(exp) => exp,
        Err(e) => {
            eprintln!("Failed to create OTLP exporter: {e:?}, falling back to console logging");
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(!pretty)
                .with_ansi(pretty)
                .init();
            return TelemetryGuard { provider: None };
        }
    };

    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter)
        .build();

    let tracer = provider.tracer(service_name.clone());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(!pretty)
        .with_ansi(pretty);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::info!(
        service_name = %service_name,
        endpoint = %endpoint,
        "OpenTelemetry initialized"
    );

    TelemetryGuard {
        provider: Some(provider),
    }
}
