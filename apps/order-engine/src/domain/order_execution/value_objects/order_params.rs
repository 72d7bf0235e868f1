//! Parameters for a new order submission.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderSide;
use crate::domain::shared::InstrumentId;

/// Everything the venue needs to submit an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParams {
    /// Order label (unique per venue account).
    pub label: String,
    /// Instrument to trade.
    pub instrument: InstrumentId,
    /// Side.
    pub side: OrderSide,
    /// Amount.
    pub amount: Decimal,
    /// Entry price; `None` for market orders.
    pub price: Option<Decimal>,
    /// Stop-loss price.
    pub stop_loss: Option<Decimal>,
    /// Take-profit price.
    pub take_profit: Option<Decimal>,
    /// Good-till time for conditional orders.
    pub good_till: Option<DateTime<Utc>>,
    /// Free-form comment.
    pub comment: Option<String>,
}

impl OrderParams {
    /// Create market order parameters.
    #[must_use]
    pub fn market(
        label: impl Into<String>,
        instrument: InstrumentId,
        side: OrderSide,
        amount: Decimal,
    ) -> Self {
        Self {
            label: label.into(),
            instrument,
            side,
            amount,
            price: None,
            stop_loss: None,
            take_profit: None,
            good_till: None,
            comment: None,
        }
    }

    /// Turn into a conditional order resting at `price`.
    #[must_use]
    pub const fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the stop-loss price.
    #[must_use]
    pub const fn with_stop_loss(mut self, price: Decimal) -> Self {
        self.stop_loss = Some(price);
        self
    }

    /// Set the take-profit price.
    #[must_use]
    pub const fn with_take_profit(mut self, price: Decimal) -> Self {
        self.take_profit = Some(price);
        self
    }

    /// Set the good-till time.
    #[must_use]
    pub const fn with_good_till(mut self, good_till: DateTime<Utc>) -> Self {
        self.good_till = Some(good_till);
        self
    }

    /// Attach a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
