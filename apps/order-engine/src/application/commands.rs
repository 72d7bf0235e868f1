//! Order Commands
//!
//! One factory per venue operation. Each returns a [`CommandBuilder`]
//! already wired with its venue call, target, classification table and
//! default retry policy, so callers only add hooks or override retry.
//!
//! Value-setting commands carry a precondition that skips the call when
//! the order already has the desired value, which saves a venue round-trip
//! and keeps two commands from racing on the same field.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::application::command::{CommandBuilder, RetryPolicy};
use crate::application::ports::Venue;
use crate::domain::order_execution::{CallReason, OrderParams, OrderSnapshot};
use crate::domain::shared::OrderId;

/// Factory for pre-wired order command builders.
#[derive(Clone)]
pub struct OrderCommands {
    venue: Arc<dyn Venue>,
    retry: RetryPolicy,
}

impl OrderCommands {
    /// Create a factory using `retry` as every command's default policy.
    #[must_use]
    pub fn new(venue: Arc<dyn Venue>, retry: RetryPolicy) -> Self {
        Self { venue, retry }
    }

    /// The venue commands are issued against.
    #[must_use]
    pub const fn venue(&self) -> &Arc<dyn Venue> {
        &self.venue
    }

    /// Default retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Submit a new order. Events are correlated against the returned order.
    pub fn submit(&self, params: OrderParams) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        self.base(CallReason::Submit)
            .action(move || venue.submit_order(&params))
    }

    /// Merge `orders` into a new order labelled `label`.
    pub fn merge(&self, label: impl Into<String>, orders: Vec<OrderId>) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let label = label.into();
        self.base(CallReason::Merge)
            .action(move || venue.merge_orders(&label, &orders))
    }

    /// Fully close an order. Skipped unless the order is filled or opened.
    pub fn close(&self, order: &OrderId) -> CommandBuilder {
        self.close_amount(order, None)
    }

    /// Close part of an order.
    pub fn partial_close(&self, order: &OrderId, amount: Decimal) -> CommandBuilder {
        self.close_amount(order, Some(amount))
    }

    /// Close at a limit `price` with an optional `slippage` allowance.
    /// `amount` of `None` closes the whole order.
    pub fn close_at(
        &self,
        order: &OrderId,
        amount: Option<Decimal>,
        price: Decimal,
        slippage: Option<Decimal>,
    ) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let id = order.clone();
        self.targeted(CallReason::Close, order)
            .action(move || {
                venue
                    .close_order_at(&id, amount, price, slippage)
                    .map(|()| id.clone())
            })
            .run_if(self.unless_known(order, |snapshot| !snapshot.state.is_closable()))
    }

    fn close_amount(&self, order: &OrderId, amount: Option<Decimal>) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let id = order.clone();
        self.targeted(CallReason::Close, order)
            .action(move || venue.close_order(&id, amount).map(|()| id.clone()))
            .run_if(self.unless_known(order, |snapshot| !snapshot.state.is_closable()))
    }

    /// Set or remove (`None`) the stop-loss.
    pub fn set_stop_loss(&self, order: &OrderId, price: Option<Decimal>) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let id = order.clone();
        self.targeted(CallReason::ChangeStopLoss, order)
            .action(move || venue.set_stop_loss(&id, price).map(|()| id.clone()))
            .run_if(self.unless_known(order, move |snapshot| snapshot.stop_loss == price))
    }

    /// Set or remove (`None`) the take-profit.
    pub fn set_take_profit(&self, order: &OrderId, price: Option<Decimal>) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let id = order.clone();
        self.targeted(CallReason::ChangeTakeProfit, order)
            .action(move || venue.set_take_profit(&id, price).map(|()| id.clone()))
            .run_if(self.unless_known(order, move |snapshot| snapshot.take_profit == price))
    }

    /// Change the label.
    pub fn set_label(&self, order: &OrderId, label: impl Into<String>) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let id = order.clone();
        let label = label.into();
        let desired = label.clone();
        self.targeted(CallReason::ChangeLabel, order)
            .action(move || venue.set_label(&id, &label).map(|()| id.clone()))
            .run_if(self.unless_known(order, move |snapshot| snapshot.label == desired))
    }

    /// Change the requested amount.
    pub fn set_requested_amount(&self, order: &OrderId, amount: Decimal) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let id = order.clone();
        self.targeted(CallReason::ChangeAmount, order)
            .action(move || venue.set_requested_amount(&id, amount).map(|()| id.clone()))
            .run_if(self.unless_known(order, move |snapshot| snapshot.amount == amount))
    }

    /// Change the good-till time.
    pub fn set_good_till_time(&self, order: &OrderId, good_till: DateTime<Utc>) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let id = order.clone();
        self.targeted(CallReason::ChangeGoodTillTime, order)
            .action(move || venue.set_good_till_time(&id, good_till).map(|()| id.clone()))
            .run_if(self.unless_known(order, move |snapshot| {
                snapshot.good_till == Some(good_till)
            }))
    }

    /// Change the open price of a resting order.
    pub fn set_open_price(&self, order: &OrderId, price: Decimal) -> CommandBuilder {
        let venue = Arc::clone(&self.venue);
        let id = order.clone();
        self.targeted(CallReason::ChangeOpenPrice, order)
            .action(move || venue.set_open_price(&id, price).map(|()| id.clone()))
            .run_if(self.unless_known(order, move |snapshot| snapshot.open_price == Some(price)))
    }

    fn base(&self, reason: CallReason) -> CommandBuilder {
        CommandBuilder::new(reason)
            .default_classification()
            .retry(self.retry)
    }

    fn targeted(&self, reason: CallReason, order: &OrderId) -> CommandBuilder {
        self.base(reason).target(order.clone())
    }

    /// Precondition that skips the call when the venue knows the order and
    /// `skip` holds for its snapshot. Unknown orders are attempted.
    fn unless_known<F>(&self, order: &OrderId, skip: F) -> impl Fn() -> bool + Send + Sync + 'static
    where
        F: Fn(&OrderSnapshot) -> bool + Send + Sync + 'static,
    {
        let venue = Arc::clone(&self.venue);
        let order = order.clone();
        move || venue.order(&order).is_none_or(|snapshot| !skip(&snapshot))
    }
}

impl std::fmt::Debug for OrderCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCommands")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
