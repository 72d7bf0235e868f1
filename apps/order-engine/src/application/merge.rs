//! Merge Workflow
//!
//! Three strictly ordered phases:
//!
//! 1. Remove take-profit then stop-loss from every order (orders concurrently)
//! 2. Merge the orders into one new order under the given label
//! 3. If the merged order is filled, restore stop-loss then take-profit
//!
//! Restore levels come from a [`RestorePolicy`] evaluated once against the
//! original orders before phase 1. A failure aborts the remaining phases;
//! completed phases are not rolled back.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::application::batch::{OrderBatch, sequence};
use crate::application::commands::OrderCommands;
use crate::application::executor::{CommandExecutor, CommandItem, CommandStream};
use crate::domain::order_execution::{OrderSnapshot, OutcomeKind};
use crate::domain::position::{RestoreLevels, RestorePolicy};
use crate::domain::shared::OrderId;
use crate::error::CommandError;

/// Runs merge workflows.
#[derive(Debug, Clone)]
pub struct MergeWorkflow {
    commands: OrderCommands,
    executor: CommandExecutor,
    batch: OrderBatch,
}

enum Phase {
    Start,
    CancelProtective(CommandStream),
    Merging(CommandStream),
    Restoring(CommandStream),
    Finished,
}

struct MergeRun {
    workflow: MergeWorkflow,
    label: String,
    orders: Vec<OrderId>,
    policy: Arc<dyn RestorePolicy>,
    levels: RestoreLevels,
    merged: Option<OrderId>,
    phase: Phase,
}

impl MergeWorkflow {
    /// Create a workflow.
    #[must_use]
    pub fn new(commands: OrderCommands, executor: CommandExecutor) -> Self {
        let batch = OrderBatch::new(commands.clone(), executor.clone());
        Self {
            commands,
            executor,
            batch,
        }
    }

    /// Merge `orders` into a new order labelled `label`.
    ///
    /// The returned stream forwards every command's events. Nothing runs
    /// until it is polled.
    pub fn run(
        &self,
        label: impl Into<String>,
        orders: Vec<OrderId>,
        policy: Arc<dyn RestorePolicy>,
    ) -> MergeStream {
        let run = MergeRun {
            workflow: self.clone(),
            label: label.into(),
            orders,
            policy,
            levels: RestoreLevels::NONE,
            merged: None,
            phase: Phase::Start,
        };
        MergeStream {
            inner: CommandStream::from_stream(stream::unfold(run, MergeRun::step).boxed()),
        }
    }

    fn snapshots(&self, orders: &[OrderId]) -> Vec<OrderSnapshot> {
        let venue = self.commands.venue();
        orders.iter().filter_map(|order| venue.order(order)).collect()
    }

    fn is_filled(&self, order: &OrderId) -> bool {
        self.commands
            .venue()
            .order(order)
            .is_some_and(|snapshot| snapshot.state.is_filled())
    }
}

impl MergeRun {
    async fn step(mut self) -> Option<(CommandItem, Self)> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Start => {
                    let snapshots = self.workflow.snapshots(&self.orders);
                    self.levels = self.policy.levels(&snapshots);
                    tracing::info!(
                        label = %self.label,
                        orders = self.orders.len(),
                        "Merge started, removing protective prices"
                    );
                    let cancel = self
                        .workflow
                        .batch
                        .cancel_protective_prices_all(self.orders.clone());
                    self.phase = Phase::CancelProtective(cancel);
                }

                Phase::CancelProtective(mut stream) => match stream.next().await {
                    Some(item) => {
                        if item.is_ok() {
                            self.phase = Phase::CancelProtective(stream);
                        }
                        return Some((item, self));
                    }
                    None => {
                        let merge = self
                            .workflow
                            .commands
                            .merge(self.label.clone(), self.orders.clone());
                        self.phase = Phase::Merging(self.workflow.executor.run(merge));
                    }
                },

                Phase::Merging(mut stream) => match stream.next().await {
                    Some(item) => {
                        match &item {
                            Ok(event) if event.kind == OutcomeKind::MergeOk => {
                                self.merged = Some(event.order.clone());
                                self.phase = Phase::Merging(stream);
                            }
                            Ok(_) => self.phase = Phase::Merging(stream),
                            Err(_) => {}
                        }
                        return Some((item, self));
                    }
                    None => {
                        let Some(merged) = self.merged.clone() else {
                            tracing::info!(label = %self.label, "Merged orders netted out, nothing to restore");
                            return None;
                        };
                        if !self.workflow.is_filled(&merged) {
                            tracing::info!(order_id = %merged, "Merged order not filled, skipping restore");
                            return None;
                        }
                        let commands = &self.workflow.commands;
                        let executor = &self.workflow.executor;
                        let restore = sequence(vec![
                            executor.run(commands.set_stop_loss(&merged, self.levels.stop_loss)),
                            executor.run(commands.set_take_profit(&merged, self.levels.take_profit)),
                        ]);
                        self.phase = Phase::Restoring(restore);
                    }
                },

                Phase::Restoring(mut stream) => {
                    let item = stream.next().await?;
                    if item.is_ok() {
                        self.phase = Phase::Restoring(stream);
                    }
                    return Some((item, self));
                }

                Phase::Finished => return None,
            }
        }
    }
}

/// Stream of a running merge workflow.
#[must_use = "merges do nothing unless the stream is polled"]
#[derive(Debug)]
pub struct MergeStream {
    inner: CommandStream,
}

impl MergeStream {
    /// Drive the workflow to completion.
    ///
    /// Returns the merged order, or `None` if the orders netted out to a
    /// zero amount and the venue closed them instead.
    ///
    /// # Errors
    ///
    /// Returns the first command failure of any phase.
    pub async fn finish(self) -> Result<Option<OrderId>, CommandError> {
        let events = self.inner.collect_events().await?;
        Ok(events
            .into_iter()
            .rev()
            .find(|event| event.kind == OutcomeKind::MergeOk)
            .map(|event| event.order))
    }

    /// The underlying event stream.
    pub fn into_stream(self) -> CommandStream {
        self.inner
    }
}
