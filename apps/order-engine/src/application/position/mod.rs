//! Position
//!
//! Tracks the orders of one instrument and runs structural operations
//! (merge, close) against them, at most one at a time.
//!
//! # Membership
//!
//! Orders join through [`Position::admit`], either automatically after a
//! submit or merge done through the position, or when supplied by the
//! caller. They leave when an end-of-order event for them is seen on the
//! shared feed, regardless of which command caused it. An optional sweeper
//! also drops entries the venue no longer reports or reports as terminal.
//!
//! # Single flight
//!
//! `close` and `merge` take the busy flag with one compare-and-set. A call
//! that finds it taken returns [`PositionOutcome::Busy`] and publishes
//! [`PositionEvent::Busy`] without touching the venue. The flag is released
//! and every entry goes back to Idle however the operation ends.

pub mod directory;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub use directory::PositionDirectory;

use crate::application::batch::{BatchMode, OrderBatch};
use crate::application::commands::OrderCommands;
use crate::application::executor::CommandExecutor;
use crate::application::merge::MergeWorkflow;
use crate::domain::order_execution::{OrderParams, OrderSnapshot, OutcomeEvent};
use crate::domain::position::{
    PositionDirection, PositionEntry, PositionEvent, PositionOperation, ProcessingState,
    RestorePolicy,
};
use crate::domain::shared::{InstrumentId, OrderId};
use crate::error::{CommandError, PositionError};
use crate::observability::record_position_operation;

/// Default number of notifications buffered per subscriber.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

type Entries = Arc<RwLock<HashMap<OrderId, PositionEntry>>>;

/// Collaborators a position issues commands through.
#[derive(Clone)]
pub struct PositionServices {
    /// Command factory.
    pub commands: OrderCommands,
    /// Command executor.
    pub executor: CommandExecutor,
    /// Restore policy used by [`Position::merge`].
    pub restore: Arc<dyn RestorePolicy>,
}

impl std::fmt::Debug for PositionServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionServices")
            .field("commands", &self.commands)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Result of [`Position::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// The order joined the position.
    Admitted,
    /// The order was already a member.
    AlreadyAdmitted,
    /// The order trades another instrument.
    InstrumentMismatch {
        /// The order's instrument.
        actual: InstrumentId,
    },
    /// The venue does not know the order.
    UnknownOrder,
}

/// Non-error result of a structural operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionOutcome {
    /// The selected orders were closed (or merged to a zero amount).
    Closed,
    /// The selected orders were merged into this order.
    Merged(OrderId),
    /// Another structural operation is in flight.
    Busy,
    /// Nothing to operate on.
    NoEligibleOrders,
}

impl PositionOutcome {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Merged(_) => "merged",
            Self::Busy => "busy",
            Self::NoEligibleOrders => "no_eligible_orders",
        }
    }
}

/// Orders of one instrument.
pub struct Position {
    instrument: InstrumentId,
    entries: Entries,
    busy: AtomicBool,
    notifications: broadcast::Sender<PositionEvent>,
    services: PositionServices,
    batch: OrderBatch,
    merge: MergeWorkflow,
    shutdown: CancellationToken,
}

/// Holds the busy flag for one structural operation.
struct OperationFence<'a> {
    position: &'a Position,
}

impl Drop for OperationFence<'_> {
    fn drop(&mut self) {
        self.position.mark_all(ProcessingState::Idle);
        self.position.busy.store(false, Ordering::Release);
    }
}

impl Position {
    /// Create a position and start its removal listener.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(instrument: InstrumentId, services: PositionServices) -> Self {
        Self::with_notification_capacity(instrument, services, DEFAULT_NOTIFICATION_CAPACITY)
    }

    /// Create a position buffering `capacity` notifications per subscriber.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn with_notification_capacity(
        instrument: InstrumentId,
        services: PositionServices,
        capacity: usize,
    ) -> Self {
        let entries: Entries = Arc::new(RwLock::new(HashMap::new()));
        let shutdown = CancellationToken::new();
        let (notifications, _) = broadcast::channel(capacity.max(1));

        // Subscribe before spawning so no event published after construction is missed.
        let receiver = services.executor.feed().subscribe();
        tokio::spawn(remove_on_end_of_order(
            instrument.clone(),
            Arc::clone(&entries),
            receiver,
            shutdown.clone(),
        ));

        let batch = OrderBatch::new(services.commands.clone(), services.executor.clone());
        let merge = MergeWorkflow::new(services.commands.clone(), services.executor.clone());

        Self {
            instrument,
            entries,
            busy: AtomicBool::new(false),
            notifications,
            services,
            batch,
            merge,
            shutdown,
        }
    }

    /// Instrument this position groups.
    #[must_use]
    pub const fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    /// Returns true while a merge or close is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Subscribe to position notifications.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<PositionEvent> {
        self.notifications.subscribe()
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Add an order as Idle if it trades this position's instrument.
    ///
    /// A mismatch or unknown order is logged and reported, never fatal.
    pub fn admit(&self, order: &OrderId) -> AdmitOutcome {
        let Some(snapshot) = self.services.commands.venue().order(order) else {
            tracing::warn!(instrument = %self.instrument, order_id = %order, "Cannot admit unknown order");
            return AdmitOutcome::UnknownOrder;
        };

        if snapshot.instrument != self.instrument {
            tracing::warn!(
                instrument = %self.instrument,
                order_id = %order,
                order_instrument = %snapshot.instrument,
                "Order belongs to another instrument, not admitted"
            );
            return AdmitOutcome::InstrumentMismatch {
                actual: snapshot.instrument,
            };
        }

        let mut entries = self.write_entries();
        if entries.contains_key(order) {
            return AdmitOutcome::AlreadyAdmitted;
        }
        entries.insert(order.clone(), PositionEntry::idle(order.clone()));
        tracing::debug!(instrument = %self.instrument, order_id = %order, "Order admitted");
        AdmitOutcome::Admitted
    }

    /// Mark every current entry Active.
    pub fn mark_all_active(&self) {
        self.mark_all(ProcessingState::Active);
    }

    fn mark_all(&self, state: ProcessingState) {
        for entry in self.write_entries().values_mut() {
            entry.state = state;
        }
    }

    /// Snapshot of every entry.
    #[must_use]
    pub fn entries(&self) -> Vec<PositionEntry> {
        let mut entries: Vec<_> = self.read_entries().values().cloned().collect();
        entries.sort_by(|a, b| a.admitted_at.cmp(&b.admitted_at));
        entries
    }

    /// Processing state of a member order.
    #[must_use]
    pub fn state_of(&self, order: &OrderId) -> Option<ProcessingState> {
        self.read_entries().get(order).map(|entry| entry.state)
    }

    /// Member orders, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderId> {
        self.entries().into_iter().map(|entry| entry.order).collect()
    }

    /// Number of member orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// Returns true if the position has no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Returns true if `order` is a member.
    #[must_use]
    pub fn contains(&self, order: &OrderId) -> bool {
        self.read_entries().contains_key(order)
    }

    /// Member orders whose snapshot matches `predicate`, in any state.
    pub fn filter<P>(&self, predicate: P) -> Vec<OrderSnapshot>
    where
        P: Fn(&OrderSnapshot) -> bool,
    {
        self.matching(|_| true, predicate)
    }

    /// Idle member orders whose snapshot matches `predicate`.
    pub fn idle_matching<P>(&self, predicate: P) -> Vec<OrderSnapshot>
    where
        P: Fn(&OrderSnapshot) -> bool,
    {
        self.matching(PositionEntry::is_idle, predicate)
    }

    fn matching<E, P>(&self, entry_filter: E, predicate: P) -> Vec<OrderSnapshot>
    where
        E: Fn(&PositionEntry) -> bool,
        P: Fn(&OrderSnapshot) -> bool,
    {
        let candidates: Vec<OrderId> = self
            .entries()
            .into_iter()
            .filter(|entry| entry_filter(entry))
            .map(|entry| entry.order)
            .collect();

        let venue = self.services.commands.venue();
        candidates
            .iter()
            .filter_map(|order| venue.order(order))
            .filter(|snapshot| predicate(snapshot))
            .collect()
    }

    /// Sum of the signed amounts of filled orders.
    #[must_use]
    pub fn signed_exposure(&self) -> Decimal {
        self.filter(|snapshot| snapshot.state.is_filled())
            .iter()
            .map(OrderSnapshot::signed_amount)
            .sum()
    }

    /// Net direction of the filled exposure.
    #[must_use]
    pub fn direction(&self) -> PositionDirection {
        PositionDirection::from_exposure(self.signed_exposure())
    }

    /// Drop entries the venue no longer knows or reports as terminal.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let venue = self.services.commands.venue();
        let stale: Vec<OrderId> = self
            .orders()
            .into_iter()
            .filter(|order| {
                venue
                    .order(order)
                    .is_none_or(|snapshot| snapshot.state.is_terminal())
            })
            .collect();

        if stale.is_empty() {
            return 0;
        }

        let mut entries = self.write_entries();
        for order in &stale {
            entries.remove(order);
        }
        tracing::debug!(instrument = %self.instrument, removed = stale.len(), "Swept stale orders");
        stale.len()
    }

    /// Sweep every `period` until the position is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let position = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(position) = position.upgrade() else {
                    break;
                };
                position.sweep();
            }
        })
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Submit a new order and admit it once it is filled (or accepted as
    /// a conditional order). Not gated by the busy flag.
    pub async fn submit(&self, params: OrderParams) -> Result<OrderId, PositionError> {
        let operation = PositionOperation::Submit;
        let builder = self.services.commands.submit(params);

        match self.services.executor.run(builder).finish().await {
            Ok(Some(event)) => {
                self.admit(&event.order);
                self.publish(PositionEvent::Submitted {
                    order: event.order.clone(),
                });
                record_position_operation(operation.as_str(), "submitted");
                Ok(event.order)
            }
            Ok(None) => Err(self.failed(operation, None)),
            Err(source) => Err(self.failed(operation, Some(source))),
        }
    }

    /// Close every idle filled or opened order concurrently.
    pub async fn close(&self) -> Result<PositionOutcome, PositionError> {
        let operation = PositionOperation::Close;
        let Some(_fence) = self.try_fence(operation) else {
            return Ok(PositionOutcome::Busy);
        };

        let orders = ids(self.idle_matching(|snapshot| snapshot.state.is_closable()));
        if orders.is_empty() {
            return Ok(self.completed(operation, PositionOutcome::NoEligibleOrders));
        }

        self.mark_all_active();
        tracing::info!(instrument = %self.instrument, orders = orders.len(), "Closing position");

        match self.batch.close_all(orders, BatchMode::Concurrent).finish().await {
            Ok(_) => {
                self.publish(PositionEvent::Closed);
                Ok(self.completed(operation, PositionOutcome::Closed))
            }
            Err(source) => Err(self.failed(operation, Some(source))),
        }
    }

    /// Merge every idle filled order under `label`, restoring protective
    /// prices with the position's restore policy.
    pub async fn merge(&self, label: &str) -> Result<PositionOutcome, PositionError> {
        let policy = Arc::clone(&self.services.restore);
        self.merge_with(label, policy).await
    }

    /// Merge every idle filled order under `label` using `policy`.
    ///
    /// Fewer than two eligible orders is [`PositionOutcome::NoEligibleOrders`].
    pub async fn merge_with(
        &self,
        label: &str,
        policy: Arc<dyn RestorePolicy>,
    ) -> Result<PositionOutcome, PositionError> {
        let operation = PositionOperation::Merge;
        let Some(_fence) = self.try_fence(operation) else {
            return Ok(PositionOutcome::Busy);
        };

        let orders = ids(self.idle_matching(|snapshot| snapshot.state.is_filled()));
        if orders.len() < 2 {
            return Ok(self.completed(operation, PositionOutcome::NoEligibleOrders));
        }

        self.mark_all_active();
        tracing::info!(
            instrument = %self.instrument,
            label,
            orders = orders.len(),
            "Merging position"
        );

        match self.merge.run(label, orders, policy).finish().await {
            Ok(Some(merged)) => {
                self.admit(&merged);
                self.publish(PositionEvent::Merged {
                    order: merged.clone(),
                });
                Ok(self.completed(operation, PositionOutcome::Merged(merged)))
            }
            Ok(None) => {
                self.publish(PositionEvent::Closed);
                Ok(self.completed(operation, PositionOutcome::Closed))
            }
            Err(source) => Err(self.failed(operation, Some(source))),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn try_fence(&self, operation: PositionOperation) -> Option<OperationFence<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!(
                instrument = %self.instrument,
                operation = %operation,
                "Position busy, operation refused"
            );
            self.publish(PositionEvent::Busy { operation });
            record_position_operation(operation.as_str(), PositionOutcome::Busy.as_str());
            return None;
        }
        Some(OperationFence { position: self })
    }

    fn completed(&self, operation: PositionOperation, outcome: PositionOutcome) -> PositionOutcome {
        record_position_operation(operation.as_str(), outcome.as_str());
        outcome
    }

    fn failed(&self, operation: PositionOperation, source: Option<CommandError>) -> PositionError {
        let error = match source {
            Some(source) => PositionError::Command {
                instrument: self.instrument.clone(),
                operation,
                source,
            },
            None => PositionError::Incomplete {
                instrument: self.instrument.clone(),
                operation,
            },
        };
        tracing::warn!(
            instrument = %self.instrument,
            operation = %operation,
            error = %error,
            "Position operation failed"
        );
        record_position_operation(operation.as_str(), "failed");
        self.publish(PositionEvent::Failed {
            operation,
            reason: error.to_string(),
        });
        error
    }

    fn publish(&self, event: PositionEvent) {
        // No subscribers is fine.
        let _ = self.notifications.send(event);
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<OrderId, PositionEntry>> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<OrderId, PositionEntry>> {
        write_entries(&self.entries)
    }
}

impl Drop for Position {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Position")
            .field("instrument", &self.instrument)
            .field("orders", &self.len())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

fn ids(snapshots: Vec<OrderSnapshot>) -> Vec<OrderId> {
    snapshots.into_iter().map(|snapshot| snapshot.id).collect()
}

fn write_entries(entries: &Entries) -> RwLockWriteGuard<'_, HashMap<OrderId, PositionEntry>> {
    entries
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Remove entries whose order ended, until `shutdown` fires.
async fn remove_on_end_of_order(
    instrument: InstrumentId,
    entries: Entries,
    mut receiver: broadcast::Receiver<OutcomeEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            received = receiver.recv() => received,
        };

        match received {
            Ok(event) if event.is_end_of_order() => {
                if write_entries(&entries).remove(&event.order).is_some() {
                    tracing::debug!(
                        instrument = %instrument,
                        order_id = %event.order,
                        kind = %event.kind,
                        "Order left position"
                    );
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(
                    instrument = %instrument,
                    skipped,
                    "Removal listener lagged, sweep will reconcile missed events"
                );
            }
            Err(RecvError::Closed) => break,
        }
    }
}
