//! Why a venue call was made.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::OrderId;

/// Operation kind a venue call performs.
///
/// Each reason has exactly one event classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallReason {
    /// Submit a new order.
    Submit,
    /// Close (fully or partially) an order.
    Close,
    /// Merge several orders into one.
    Merge,
    /// Change stop-loss price.
    ChangeStopLoss,
    /// Change take-profit price.
    ChangeTakeProfit,
    /// Change order label.
    ChangeLabel,
    /// Change requested amount.
    ChangeAmount,
    /// Change good-till time.
    ChangeGoodTillTime,
    /// Change open price of a conditional order.
    ChangeOpenPrice,
}

impl CallReason {
    /// Every reason, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Submit,
        Self::Close,
        Self::Merge,
        Self::ChangeStopLoss,
        Self::ChangeTakeProfit,
        Self::ChangeLabel,
        Self::ChangeAmount,
        Self::ChangeGoodTillTime,
        Self::ChangeOpenPrice,
    ];

    /// Stable lowercase name, used as a metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Close => "close",
            Self::Merge => "merge",
            Self::ChangeStopLoss => "change_stop_loss",
            Self::ChangeTakeProfit => "change_take_profit",
            Self::ChangeLabel => "change_label",
            Self::ChangeAmount => "change_amount",
            Self::ChangeGoodTillTime => "change_good_till_time",
            Self::ChangeOpenPrice => "change_open_price",
        }
    }

    /// Returns true for calls that change the set of orders (submit, merge, close).
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Submit | Self::Close | Self::Merge)
    }
}

impl fmt::Display for CallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call registered against an order while its outcome is pending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallRequest {
    /// Order the call targets.
    pub order: OrderId,
    /// What the call does.
    pub reason: CallReason,
}

impl CallRequest {
    /// Create a new call request.
    #[must_use]
    pub const fn new(order: OrderId, reason: CallReason) -> Self {
        Self { order, reason }
    }
}
