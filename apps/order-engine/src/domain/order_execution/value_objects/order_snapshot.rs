//! Point-in-time view of a venue order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderSide, OrderState};
use crate::domain::shared::{InstrumentId, OrderId};

/// Read-only copy of an order's venue-side fields.
///
/// `None` for `stop_loss` / `take_profit` is the "no protective price"
/// sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    /// Venue identity.
    pub id: OrderId,
    /// Instrument the order trades.
    pub instrument: InstrumentId,
    /// Order label.
    pub label: String,
    /// Side.
    pub side: OrderSide,
    /// Current state.
    pub state: OrderState,
    /// Requested (or remaining) amount.
    pub amount: Decimal,
    /// Open price, if known.
    pub open_price: Option<Decimal>,
    /// Stop-loss price.
    pub stop_loss: Option<Decimal>,
    /// Take-profit price.
    pub take_profit: Option<Decimal>,
    /// Good-till time for conditional orders.
    pub good_till: Option<DateTime<Utc>>,
}

impl OrderSnapshot {
    /// Amount with the side's sign applied.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.side.signed(self.amount)
    }

    /// True if the stop-loss already equals `price`.
    #[must_use]
    pub fn has_stop_loss(&self, price: Option<Decimal>) -> bool {
        self.stop_loss == price
    }

    /// True if the take-profit already equals `price`.
    #[must_use]
    pub fn has_take_profit(&self, price: Option<Decimal>) -> bool {
        self.take_profit == price
    }
}
