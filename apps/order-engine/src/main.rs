//! Order Engine Binary
//!
//! Runs a demonstration session against the in-process paper venue:
//! two orders are submitted, merged under a new label with their
//! protective prices restored, and the resulting position is closed.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-engine
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_ENGINE_CONFIG`: Path to the YAML config (default: `config.yaml` if present)
//! - `RUST_LOG`: Log filter (default: the configured level)
//! - `OTEL_ENABLED`: Set to `false` to disable trace export

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use order_engine::application::ports::OutcomeFeed;
use order_engine::application::{
    CommandExecutor, OrderCommands, PositionDirectory, PositionOutcome, PositionServices,
};
use order_engine::config::{Config, load_config};
use order_engine::domain::order_execution::{OrderParams, OrderSide, OrderSnapshot};
use order_engine::domain::position::RestoreLevels;
use order_engine::domain::shared::InstrumentId;
use order_engine::infrastructure::venue::PaperVenue;
use order_engine::observability::init_metrics;
use order_engine::telemetry::init_telemetry;
use rust_decimal_macros::dec;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_ancestors();

    let config = read_config()?;
    let _telemetry = init_telemetry(&config.observability.logging.level);

    tracing::info!(
        retry_attempts = config.execution.retry_attempts,
        retry_delay_ms = config.execution.retry_delay_ms,
        context = ?config.execution.context,
        feed_capacity = config.feed.capacity,
        "Configuration loaded"
    );

    let metrics = &config.observability.metrics;
    if metrics.enabled {
        if let Err(e) = init_metrics(&metrics.to_metrics_config()) {
            tracing::warn!(error = %e, "Failed to start metrics exporter, continuing without it");
        }
    }

    let feed = Arc::new(OutcomeFeed::new(config.feed.capacity));
    let venue = Arc::new(PaperVenue::new(Arc::clone(&feed)));
    let services = PositionServices {
        commands: OrderCommands::new(venue, config.execution.retry_policy()),
        executor: CommandExecutor::new(feed, config.execution.context),
        restore: Arc::new(widest_levels),
    };
    let positions = PositionDirectory::new(
        services,
        config.position.notification_capacity,
        config.position.sweep_interval(),
    );

    run_demo(&positions).await?;

    let remaining: Vec<_> = positions.instruments();
    for (instrument, outcome) in positions.close_all().await {
        match outcome {
            Ok(outcome) => tracing::info!(instrument = %instrument, outcome = ?outcome, "Position closed"),
            Err(e) => tracing::warn!(instrument = %instrument, error = %e, "Position close failed"),
        }
    }

    tracing::info!(positions = remaining.len(), "Order engine stopped");
    Ok(())
}

/// Submit two orders, merge them, then close the position.
async fn run_demo(positions: &PositionDirectory) -> anyhow::Result<()> {
    let instrument = InstrumentId::new("EUR/USD");
    let position = positions.position(&instrument);

    let shutdown = CancellationToken::new();
    let mut notifications = position.notifications();
    let listener_shutdown = shutdown.clone();
    let listener = tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                biased;
                () = listener_shutdown.cancelled() => break,
                received = notifications.recv() => received,
            };
            match received {
                Ok(event) => tracing::info!(event = ?event, "Position notification"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let first = position
        .submit(
            OrderParams::market("demo-1", instrument.clone(), OrderSide::Buy, dec!(100000))
                .with_stop_loss(dec!(1.0750))
                .with_take_profit(dec!(1.0950)),
        )
        .await
        .context("submitting first order")?;
    let second = position
        .submit(
            OrderParams::market("demo-2", instrument.clone(), OrderSide::Buy, dec!(50000))
                .with_stop_loss(dec!(1.0700))
                .with_take_profit(dec!(1.0900)),
        )
        .await
        .context("submitting second order")?;

    tracing::info!(
        first = %first,
        second = %second,
        exposure = %position.signed_exposure(),
        direction = ?position.direction(),
        "Orders filled"
    );

    match position.merge("demo-merged").await.context("merging position")? {
        PositionOutcome::Merged(order) => tracing::info!(order_id = %order, "Position merged"),
        outcome => tracing::info!(outcome = ?outcome, "Merge did not produce an order"),
    }

    let outcome = position.close().await.context("closing position")?;
    tracing::info!(outcome = ?outcome, remaining = position.len(), "Demo finished");

    shutdown.cancel();
    listener.await.context("notification listener")?;
    Ok(())
}

/// Keep the widest protective prices of the merged orders.
fn widest_levels(orders: &[OrderSnapshot]) -> RestoreLevels {
    RestoreLevels {
        stop_loss: orders.iter().filter_map(|o| o.stop_loss).min(),
        take_profit: orders.iter().filter_map(|o| o.take_profit).max(),
    }
}

/// Load the configured file, `config.yaml` if present, or defaults.
fn read_config() -> anyhow::Result<Config> {
    if let Ok(path) = std::env::var("ORDER_ENGINE_CONFIG") {
        return load_config(Some(&path)).with_context(|| format!("loading {path}"));
    }
    if Path::new("config.yaml").exists() {
        return load_config(None).context("loading config.yaml");
    }
    Ok(Config::default())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
