//! In-process paper venue.
//!
//! Keeps orders in memory and publishes the outcome of every accepted call
//! to the outcome feed before the call returns. Market orders fill at once;
//! orders with an entry price rest as Opened until [`PaperVenue::fill`].
//!
//! Responses can be scripted per call reason to simulate venue rejections,
//! immediate failures, or calls whose outcome never arrives.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::application::ports::{OutcomeFeed, Venue, VenueError};
use crate::domain::order_execution::{
    CallReason, OrderParams, OrderSide, OrderSnapshot, OrderState, OutcomeEvent, OutcomeKind,
};
use crate::domain::shared::OrderId;

/// Scripted response to the next call of a given reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Accept the call, then publish the reason's rejection event.
    Reject,
    /// Fail the call synchronously.
    Fail(VenueError),
    /// Accept the call and publish nothing.
    Silent,
}

/// A call received by the paper venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueCall {
    /// `submit_order`
    Submit {
        /// Requested label.
        label: String,
    },
    /// `merge_orders`
    Merge {
        /// Label of the merged order.
        label: String,
        /// Orders to merge.
        orders: Vec<OrderId>,
    },
    /// `close_order` or `close_order_at`
    Close {
        /// Target order.
        order: OrderId,
        /// Partial amount, `None` for a full close.
        amount: Option<Decimal>,
        /// Limit price for `close_order_at`.
        price: Option<Decimal>,
        /// Accepted slippage for `close_order_at`.
        slippage: Option<Decimal>,
    },
    /// `set_stop_loss`
    SetStopLoss {
        /// Target order.
        order: OrderId,
        /// New price.
        price: Option<Decimal>,
    },
    /// `set_take_profit`
    SetTakeProfit {
        /// Target order.
        order: OrderId,
        /// New price.
        price: Option<Decimal>,
    },
    /// `set_label`
    SetLabel {
        /// Target order.
        order: OrderId,
        /// New label.
        label: String,
    },
    /// `set_requested_amount`
    SetRequestedAmount {
        /// Target order.
        order: OrderId,
        /// New amount.
        amount: Decimal,
    },
    /// `set_good_till_time`
    SetGoodTillTime {
        /// Target order.
        order: OrderId,
        /// New good-till time.
        good_till: DateTime<Utc>,
    },
    /// `set_open_price`
    SetOpenPrice {
        /// Target order.
        order: OrderId,
        /// New open price.
        price: Decimal,
    },
}

impl VenueCall {
    /// Call reason this venue call corresponds to.
    #[must_use]
    pub const fn reason(&self) -> CallReason {
        match self {
            Self::Submit { .. } => CallReason::Submit,
            Self::Merge { .. } => CallReason::Merge,
            Self::Close { .. } => CallReason::Close,
            Self::SetStopLoss { .. } => CallReason::ChangeStopLoss,
            Self::SetTakeProfit { .. } => CallReason::ChangeTakeProfit,
            Self::SetLabel { .. } => CallReason::ChangeLabel,
            Self::SetRequestedAmount { .. } => CallReason::ChangeAmount,
            Self::SetGoodTillTime { .. } => CallReason::ChangeGoodTillTime,
            Self::SetOpenPrice { .. } => CallReason::ChangeOpenPrice,
        }
    }

    /// Target order, for calls on an existing order.
    #[must_use]
    pub const fn order(&self) -> Option<&OrderId> {
        match self {
            Self::Submit { .. } | Self::Merge { .. } => None,
            Self::Close { order, .. }
            | Self::SetStopLoss { order, .. }
            | Self::SetTakeProfit { order, .. }
            | Self::SetLabel { order, .. }
            | Self::SetRequestedAmount { order, .. }
            | Self::SetGoodTillTime { order, .. }
            | Self::SetOpenPrice { order, .. } => Some(order),
        }
    }
}

/// Paper venue publishing outcomes to an [`OutcomeFeed`].
#[derive(Debug)]
pub struct PaperVenue {
    feed: Arc<OutcomeFeed>,
    orders: RwLock<HashMap<OrderId, OrderSnapshot>>,
    script: Mutex<HashMap<CallReason, VecDeque<Scripted>>>,
    calls: Mutex<Vec<VenueCall>>,
    next_id: AtomicU64,
}

impl PaperVenue {
    /// Create an empty venue.
    #[must_use]
    pub fn new(feed: Arc<OutcomeFeed>) -> Self {
        Self {
            feed,
            orders: RwLock::new(HashMap::new()),
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert an existing order without publishing anything.
    pub fn seed(&self, snapshot: OrderSnapshot) {
        self.write_orders().insert(snapshot.id.clone(), snapshot);
    }

    /// Queue a scripted response for the next call with `reason`.
    ///
    /// Responses are consumed in the order they were queued; unscripted
    /// calls behave normally.
    pub fn script(&self, reason: CallReason, response: Scripted) {
        lock(&self.script).entry(reason).or_default().push_back(response);
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<VenueCall> {
        lock(&self.calls).clone()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Fill a resting order.
    ///
    /// # Errors
    ///
    /// Fails if the order is unknown or not resting.
    pub fn fill(&self, order: &OrderId) -> Result<(), VenueError> {
        self.update(order, |snapshot| {
            if !snapshot.state.is_opened() {
                return Err(rejected("order is not resting"));
            }
            snapshot.state = OrderState::Filled;
            Ok(OutcomeKind::FullFillOk)
        })
    }

    fn record(&self, call: VenueCall) -> Option<Scripted> {
        let reason = call.reason();
        tracing::debug!(reason = %reason, order_id = ?call.order(), "Paper venue call");
        lock(&self.calls).push(call);
        lock(&self.script).get_mut(&reason).and_then(VecDeque::pop_front)
    }

    /// Apply a scripted response for a call on an existing order.
    ///
    /// Returns `None` when the call should proceed normally.
    fn scripted(
        &self,
        response: Option<Scripted>,
        reason: CallReason,
        order: &OrderId,
    ) -> Option<Result<(), VenueError>> {
        match response? {
            Scripted::Fail(error) => Some(Err(error)),
            Scripted::Silent => Some(Ok(())),
            Scripted::Reject => {
                self.publish(order, rejection_kind(reason));
                Some(Ok(()))
            }
        }
    }

    fn update<F>(&self, order: &OrderId, change: F) -> Result<(), VenueError>
    where
        F: FnOnce(&mut OrderSnapshot) -> Result<OutcomeKind, VenueError>,
    {
        let kind = {
            let mut orders = self.write_orders();
            let snapshot = orders.get_mut(order).ok_or_else(|| VenueError::OrderNotFound {
                order_id: order.to_string(),
            })?;
            change(snapshot)?
        };
        self.publish(order, kind);
        Ok(())
    }

    fn publish(&self, order: &OrderId, kind: OutcomeKind) {
        self.feed.publish(OutcomeEvent::new(order.clone(), kind));
    }

    fn generate_id(&self) -> OrderId {
        OrderId::new(format!(
            "paper-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        ))
    }

    fn read_orders(&self) -> RwLockReadGuard<'_, HashMap<OrderId, OrderSnapshot>> {
        self.orders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_orders(&self) -> RwLockWriteGuard<'_, HashMap<OrderId, OrderSnapshot>> {
        self.orders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn close(&self, call: VenueCall) -> Result<(), VenueError> {
        let VenueCall::Close { order, amount, .. } = call.clone() else {
            return Err(VenueError::Unknown {
                message: format!("{} is not a close call", call.reason()),
            });
        };
        let response = self.record(call);
        if let Some(result) = self.scripted(response, CallReason::Close, &order) {
            return result;
        }

        self.update(&order, |snapshot| {
            if !snapshot.state.is_closable() {
                return Err(rejected("order is not closable"));
            }
            match amount {
                Some(part) if part < snapshot.amount => {
                    snapshot.amount -= part;
                    Ok(OutcomeKind::PartialCloseOk)
                }
                _ => {
                    snapshot.state = OrderState::Closed;
                    Ok(OutcomeKind::CloseOk)
                }
            }
        })
    }

    fn set_value<F>(
        &self,
        call: VenueCall,
        done: OutcomeKind,
        apply: F,
    ) -> Result<(), VenueError>
    where
        F: FnOnce(&mut OrderSnapshot) -> Result<(), VenueError>,
    {
        let reason = call.reason();
        let Some(order) = call.order().cloned() else {
            return Err(VenueError::Unknown {
                message: format!("{reason} call without a target order"),
            });
        };
        let response = self.record(call);
        if let Some(result) = self.scripted(response, reason, &order) {
            return result;
        }
        self.update(&order, |snapshot| {
            if snapshot.state.is_terminal() {
                return Err(rejected("order is no longer active"));
            }
            apply(snapshot)?;
            Ok(done)
        })
    }
}

impl Venue for PaperVenue {
    fn submit_order(&self, params: &OrderParams) -> Result<OrderId, VenueError> {
        let response = self.record(VenueCall::Submit {
            label: params.label.clone(),
        });
        let id = self.generate_id();

        match response {
            Some(Scripted::Fail(error)) => return Err(error),
            Some(Scripted::Silent) => return Ok(id),
            Some(Scripted::Reject) => {
                self.publish(&id, OutcomeKind::SubmitRejected);
                return Ok(id);
            }
            None => {}
        }

        if params.amount <= Decimal::ZERO {
            return Err(rejected("amount must be positive"));
        }

        let state = if params.price.is_some() {
            OrderState::Opened
        } else {
            OrderState::Filled
        };
        self.seed(OrderSnapshot {
            id: id.clone(),
            instrument: params.instrument.clone(),
            label: params.label.clone(),
            side: params.side,
            state,
            amount: params.amount,
            open_price: params.price,
            stop_loss: params.stop_loss,
            take_profit: params.take_profit,
            good_till: params.good_till,
        });

        self.publish(&id, OutcomeKind::SubmitOk);
        if state.is_filled() {
            self.publish(&id, OutcomeKind::FullFillOk);
        } else {
            self.publish(&id, OutcomeKind::SubmitConditionalOk);
        }
        Ok(id)
    }

    fn merge_orders(&self, label: &str, orders: &[OrderId]) -> Result<OrderId, VenueError> {
        let response = self.record(VenueCall::Merge {
            label: label.to_string(),
            orders: orders.to_vec(),
        });
        let id = self.generate_id();

        match response {
            Some(Scripted::Fail(error)) => return Err(error),
            Some(Scripted::Silent) => return Ok(id),
            Some(Scripted::Reject) => {
                self.publish(&id, OutcomeKind::MergeRejected);
                return Ok(id);
            }
            None => {}
        }

        if orders.len() < 2 {
            return Err(rejected("merge needs at least two orders"));
        }

        let merged = {
            let mut book = self.write_orders();
            let mut constituents = Vec::with_capacity(orders.len());
            for order in orders {
                let snapshot = book.get(order).ok_or_else(|| VenueError::OrderNotFound {
                    order_id: order.to_string(),
                })?;
                if !snapshot.state.is_filled() {
                    return Err(rejected("only filled orders can be merged"));
                }
                constituents.push(snapshot.clone());
            }

            let instrument = constituents[0].instrument.clone();
            if constituents.iter().any(|c| c.instrument != instrument) {
                return Err(rejected("orders trade different instruments"));
            }

            let net: Decimal = constituents.iter().map(OrderSnapshot::signed_amount).sum();
            for order in orders {
                if let Some(snapshot) = book.get_mut(order) {
                    snapshot.state = OrderState::Closed;
                }
            }

            let side = if net < Decimal::ZERO {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            };
            let snapshot = OrderSnapshot {
                id: id.clone(),
                instrument,
                label: label.to_string(),
                side,
                state: if net.is_zero() {
                    OrderState::Closed
                } else {
                    OrderState::Filled
                },
                amount: net.abs(),
                open_price: None,
                stop_loss: None,
                take_profit: None,
                good_till: None,
            };
            book.insert(id.clone(), snapshot.clone());
            snapshot
        };

        for order in orders {
            self.publish(order, OutcomeKind::MergeCloseOk);
        }
        if merged.state.is_filled() {
            self.publish(&id, OutcomeKind::MergeOk);
        } else {
            self.publish(&id, OutcomeKind::MergeCloseOk);
        }
        Ok(id)
    }

    fn close_order(&self, order: &OrderId, amount: Option<Decimal>) -> Result<(), VenueError> {
        self.close(VenueCall::Close {
            order: order.clone(),
            amount,
            price: None,
            slippage: None,
        })
    }

    fn close_order_at(
        &self,
        order: &OrderId,
        amount: Option<Decimal>,
        price: Decimal,
        slippage: Option<Decimal>,
    ) -> Result<(), VenueError> {
        if price <= Decimal::ZERO {
            return Err(rejected("close price must be positive"));
        }
        if slippage.is_some_and(|s| s < Decimal::ZERO) {
            return Err(rejected("slippage must not be negative"));
        }
        self.close(VenueCall::Close {
            order: order.clone(),
            amount,
            price: Some(price),
            slippage,
        })
    }

    fn set_stop_loss(&self, order: &OrderId, price: Option<Decimal>) -> Result<(), VenueError> {
        let call = VenueCall::SetStopLoss {
            order: order.clone(),
            price,
        };
        self.set_value(call, OutcomeKind::ChangedSl, |snapshot| {
            snapshot.stop_loss = price;
            Ok(())
        })
    }

    fn set_take_profit(&self, order: &OrderId, price: Option<Decimal>) -> Result<(), VenueError> {
        let call = VenueCall::SetTakeProfit {
            order: order.clone(),
            price,
        };
        self.set_value(call, OutcomeKind::ChangedTp, |snapshot| {
            snapshot.take_profit = price;
            Ok(())
        })
    }

    fn set_label(&self, order: &OrderId, label: &str) -> Result<(), VenueError> {
        let call = VenueCall::SetLabel {
            order: order.clone(),
            label: label.to_string(),
        };
        self.set_value(call, OutcomeKind::ChangedLabel, |snapshot| {
            snapshot.label = label.to_string();
            Ok(())
        })
    }

    fn set_requested_amount(&self, order: &OrderId, amount: Decimal) -> Result<(), VenueError> {
        let call = VenueCall::SetRequestedAmount {
            order: order.clone(),
            amount,
        };
        self.set_value(call, OutcomeKind::ChangedAmount, |snapshot| {
            if amount <= Decimal::ZERO {
                return Err(rejected("amount must be positive"));
            }
            snapshot.amount = amount;
            Ok(())
        })
    }

    fn set_good_till_time(
        &self,
        order: &OrderId,
        good_till: DateTime<Utc>,
    ) -> Result<(), VenueError> {
        let call = VenueCall::SetGoodTillTime {
            order: order.clone(),
            good_till,
        };
        self.set_value(call, OutcomeKind::ChangedGtt, |snapshot| {
            if !snapshot.state.is_opened() {
                return Err(rejected("good-till time only applies to resting orders"));
            }
            snapshot.good_till = Some(good_till);
            Ok(())
        })
    }

    fn set_open_price(&self, order: &OrderId, price: Decimal) -> Result<(), VenueError> {
        let call = VenueCall::SetOpenPrice {
            order: order.clone(),
            price,
        };
        self.set_value(call, OutcomeKind::ChangedPrice, |snapshot| {
            if !snapshot.state.is_opened() {
                return Err(rejected("open price only applies to resting orders"));
            }
            snapshot.open_price = Some(price);
            Ok(())
        })
    }

    fn order(&self, order: &OrderId) -> Option<OrderSnapshot> {
        self.read_orders().get(order).cloned()
    }
}

/// Rejection event the venue publishes for `reason`.
const fn rejection_kind(reason: CallReason) -> OutcomeKind {
    match reason {
        CallReason::Submit => OutcomeKind::SubmitRejected,
        CallReason::Close => OutcomeKind::CloseRejected,
        CallReason::Merge => OutcomeKind::MergeRejected,
        CallReason::ChangeStopLoss => OutcomeKind::ChangeSlRejected,
        CallReason::ChangeTakeProfit => OutcomeKind::ChangeTpRejected,
        CallReason::ChangeLabel => OutcomeKind::ChangeLabelRejected,
        CallReason::ChangeAmount => OutcomeKind::ChangeAmountRejected,
        CallReason::ChangeGoodTillTime => OutcomeKind::ChangeGttRejected,
        CallReason::ChangeOpenPrice => OutcomeKind::ChangePriceRejected,
    }
}

fn rejected(reason: &str) -> VenueError {
    VenueError::CallRejected {
        reason: reason.to_string(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
