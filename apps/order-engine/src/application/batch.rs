//! Batch Orchestrator
//!
//! Composes one command stream per order into a single stream, either
//! concurrently (results interleave as they arrive) or sequentially (each
//! order starts only after the previous one finished). Both modes stop at
//! the first error; work already done by other orders stands.

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::application::commands::OrderCommands;
use crate::application::executor::{CommandExecutor, CommandItem, CommandStream};
use crate::domain::shared::OrderId;

/// How per-order operations are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Start every operation at once.
    #[default]
    Concurrent,
    /// Start each operation after the previous one completed.
    Sequential,
}

/// End `stream` right after its first error, dropping whatever is still
/// running inside it.
pub(crate) fn until_first_error(
    stream: BoxStream<'static, CommandItem>,
) -> BoxStream<'static, CommandItem> {
    stream::unfold(Some(stream), |state| async move {
        let mut inner = state?;
        let item = inner.next().await?;
        let rest = if item.is_err() { None } else { Some(inner) };
        Some((item, rest))
    })
    .boxed()
}

/// Run `streams` one after the other, stopping at the first error.
pub(crate) fn sequence(streams: Vec<CommandStream>) -> CommandStream {
    let chained = stream::iter(streams).flat_map(CommandStream::into_inner).boxed();
    CommandStream::from_stream(until_first_error(chained))
}

/// Run `streams` together, stopping at the first error.
pub(crate) fn interleave(streams: Vec<CommandStream>) -> CommandStream {
    if streams.is_empty() {
        return CommandStream::empty();
    }
    let merged = stream::select_all(streams.into_iter().map(CommandStream::into_inner)).boxed();
    CommandStream::from_stream(until_first_error(merged))
}

/// Apply `operation` to every order in `mode`.
///
/// Sequential mode builds each order's stream only when its predecessor
/// completed successfully.
pub fn apply<F>(orders: Vec<OrderId>, mode: BatchMode, operation: F) -> CommandStream
where
    F: Fn(&OrderId) -> CommandStream + Send + 'static,
{
    match mode {
        BatchMode::Concurrent => interleave(orders.iter().map(&operation).collect()),
        BatchMode::Sequential => {
            let chained = stream::iter(orders)
                .flat_map(move |order| operation(&order).into_inner())
                .boxed();
            CommandStream::from_stream(until_first_error(chained))
        }
    }
}

/// Common batches over a set of orders.
#[derive(Debug, Clone)]
pub struct OrderBatch {
    commands: OrderCommands,
    executor: CommandExecutor,
}

impl OrderBatch {
    /// Create a batch runner.
    #[must_use]
    pub const fn new(commands: OrderCommands, executor: CommandExecutor) -> Self {
        Self { commands, executor }
    }

    /// Close every order.
    pub fn close_all(&self, orders: Vec<OrderId>, mode: BatchMode) -> CommandStream {
        let (commands, executor) = (self.commands.clone(), self.executor.clone());
        apply(orders, mode, move |order| executor.run(commands.close(order)))
    }

    /// Remove the stop-loss of every order.
    pub fn cancel_stop_loss_all(&self, orders: Vec<OrderId>, mode: BatchMode) -> CommandStream {
        let (commands, executor) = (self.commands.clone(), self.executor.clone());
        apply(orders, mode, move |order| {
            executor.run(commands.set_stop_loss(order, None))
        })
    }

    /// Remove the take-profit of every order.
    pub fn cancel_take_profit_all(&self, orders: Vec<OrderId>, mode: BatchMode) -> CommandStream {
        let (commands, executor) = (self.commands.clone(), self.executor.clone());
        apply(orders, mode, move |order| {
            executor.run(commands.set_take_profit(order, None))
        })
    }

    /// Remove take-profit then stop-loss of each order, orders concurrently.
    pub fn cancel_protective_prices_all(&self, orders: Vec<OrderId>) -> CommandStream {
        let (commands, executor) = (self.commands.clone(), self.executor.clone());
        apply(orders, BatchMode::Concurrent, move |order| {
            sequence(vec![
                executor.run(commands.set_take_profit(order, None)),
                executor.run(commands.set_stop_loss(order, None)),
            ])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::CommandBuilder;
    use crate::application::ports::{ExecutionContext, OutcomeFeed, VenueError};
    use crate::domain::order_execution::{CallReason, OutcomeEvent, OutcomeKind};
    use crate::error::CommandError;
    use std::sync::{Arc, Mutex};

    struct Harness {
        executor: CommandExecutor,
        feed: Arc<OutcomeFeed>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Harness {
        fn new() -> Self {
            let feed = Arc::new(OutcomeFeed::default());
            Self {
                executor: CommandExecutor::new(Arc::clone(&feed), ExecutionContext::Inline),
                feed,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Close command answering CloseOk, or failing immediately for "bad".
        fn close(&self, order: &OrderId) -> CommandStream {
            let feed = Arc::clone(&self.feed);
            let calls = Arc::clone(&self.calls);
            let id = order.clone();
            self.executor.run(
                CommandBuilder::new(CallReason::Close)
                    .target(order.clone())
                    .default_classification()
                    .action(move || {
                        calls.lock().unwrap().push(id.to_string());
                        if id.as_str() == "bad" {
                            return Err(VenueError::CallRejected {
                                reason: "locked".to_string(),
                            });
                        }
                        feed.publish(OutcomeEvent::new(id.clone(), OutcomeKind::CloseOk));
                        Ok(id.clone())
                    }),
            )
        }
    }

    fn ids(names: &[&str]) -> Vec<OrderId> {
        names.iter().map(|n| OrderId::new(*n)).collect()
    }

    #[tokio::test]
    async fn sequential_runs_in_order() {
        let harness = Arc::new(Harness::new());
        let runner = Arc::clone(&harness);

        let events = apply(ids(&["a", "b", "c"]), BatchMode::Sequential, move |order| {
            runner.close(order)
        })
        .collect_events()
        .await
        .unwrap();

        let closed: Vec<_> = events.iter().map(|e| e.order.to_string()).collect();
        assert_eq!(closed, vec!["a", "b", "c"]);
        assert_eq!(*harness.calls.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn sequential_stops_at_first_error() {
        let harness = Arc::new(Harness::new());
        let runner = Arc::clone(&harness);

        let result = apply(ids(&["a", "bad", "c"]), BatchMode::Sequential, move |order| {
            runner.close(order)
        })
        .finish()
        .await;

        assert!(matches!(result, Err(CommandError::ImmediateCallFailure { .. })));
        assert_eq!(*harness.calls.lock().unwrap(), vec!["a", "bad"]);
    }

    #[tokio::test]
    async fn concurrent_delivers_every_result() {
        let harness = Arc::new(Harness::new());
        let runner = Arc::clone(&harness);

        let events = apply(ids(&["a", "b"]), BatchMode::Concurrent, move |order| {
            runner.close(order)
        })
        .collect_events()
        .await
        .unwrap();

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == OutcomeKind::CloseOk));
    }

    #[tokio::test]
    async fn concurrent_surfaces_first_error() {
        let harness = Arc::new(Harness::new());
        let runner = Arc::clone(&harness);

        let result = apply(ids(&["bad", "a"]), BatchMode::Concurrent, move |order| {
            runner.close(order)
        })
        .finish()
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_batch_completes() {
        let result = apply(Vec::new(), BatchMode::Concurrent, |_| CommandStream::empty())
            .finish()
            .await;
        assert_eq!(result, Ok(None));
    }
}
