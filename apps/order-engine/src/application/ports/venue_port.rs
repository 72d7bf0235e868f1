//! Venue Port (Driven Port)
//!
//! Blocking call surface of a trading venue. A call either returns an
//! acknowledgement or fails immediately; its real outcome arrives later
//! as an outcome event on the shared feed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::order_execution::{OrderParams, OrderSnapshot};
use crate::domain::shared::OrderId;

/// Immediate failure of a venue call.
///
/// A call that fails this way was never accepted by the venue, so no
/// outcome event will follow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    /// Venue refused the call synchronously.
    #[error("Call rejected by venue: {reason}")]
    CallRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Order not found.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The missing order ID.
        order_id: String,
    },

    /// Venue not reachable.
    #[error("Venue unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Unknown error.
    #[error("Venue error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for venue interactions.
///
/// Every method blocks the calling thread until the venue acknowledges
/// the request, so callers run them off the async executor.
pub trait Venue: Send + Sync {
    /// Submit a new order. Returns the venue-assigned identity.
    fn submit_order(&self, params: &OrderParams) -> Result<OrderId, VenueError>;

    /// Merge orders into a new one under `label`. Returns the new order's identity.
    fn merge_orders(&self, label: &str, orders: &[OrderId]) -> Result<OrderId, VenueError>;

    /// Close an order, fully when `amount` is `None`.
    fn close_order(&self, order: &OrderId, amount: Option<Decimal>) -> Result<(), VenueError>;

    /// Close at a limit `price`, accepting fills up to `slippage` away
    /// from it. `None` slippage leaves it to the venue default.
    fn close_order_at(
        &self,
        order: &OrderId,
        amount: Option<Decimal>,
        price: Decimal,
        slippage: Option<Decimal>,
    ) -> Result<(), VenueError>;

    /// Set the stop-loss; `None` removes it.
    fn set_stop_loss(&self, order: &OrderId, price: Option<Decimal>) -> Result<(), VenueError>;

    /// Set the take-profit; `None` removes it.
    fn set_take_profit(&self, order: &OrderId, price: Option<Decimal>) -> Result<(), VenueError>;

    /// Change the order label.
    fn set_label(&self, order: &OrderId, label: &str) -> Result<(), VenueError>;

    /// Change the requested amount.
    fn set_requested_amount(&self, order: &OrderId, amount: Decimal) -> Result<(), VenueError>;

    /// Change the good-till time.
    fn set_good_till_time(&self, order: &OrderId, good_till: DateTime<Utc>)
    -> Result<(), VenueError>;

    /// Change the open price of a resting order.
    fn set_open_price(&self, order: &OrderId, price: Decimal) -> Result<(), VenueError>;

    /// Local read of an order's current state.
    fn order(&self, order: &OrderId) -> Option<OrderSnapshot>;
}
