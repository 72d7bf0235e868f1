//! Restore policies for protective prices after a merge.
//!
//! A policy is evaluated once, against the orders about to be merged,
//! before their protective prices are removed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::OrderSnapshot;

/// Protective prices to put on a merged order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RestoreLevels {
    /// Stop-loss to restore; `None` leaves it unset.
    pub stop_loss: Option<Decimal>,
    /// Take-profit to restore; `None` leaves it unset.
    pub take_profit: Option<Decimal>,
}

impl RestoreLevels {
    /// Levels that leave both prices unset.
    pub const NONE: Self = Self {
        stop_loss: None,
        take_profit: None,
    };
}

/// Computes restore levels from the pre-merge orders.
pub trait RestorePolicy: Send + Sync {
    /// Levels for the merged order.
    fn levels(&self, orders: &[OrderSnapshot]) -> RestoreLevels;
}

/// Never restore protective prices.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRestore;

impl RestorePolicy for NoRestore {
    fn levels(&self, _orders: &[OrderSnapshot]) -> RestoreLevels {
        RestoreLevels::NONE
    }
}

/// Restore fixed prices regardless of the merged orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLevels(pub RestoreLevels);

impl RestorePolicy for FixedLevels {
    fn levels(&self, _orders: &[OrderSnapshot]) -> RestoreLevels {
        self.0
    }
}

impl<F> RestorePolicy for F
where
    F: Fn(&[OrderSnapshot]) -> RestoreLevels + Send + Sync,
{
    fn levels(&self, orders: &[OrderSnapshot]) -> RestoreLevels {
        self(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn closure_policy_sees_orders() {
        let policy = |orders: &[OrderSnapshot]| RestoreLevels {
            stop_loss: orders.first().and_then(|o| o.stop_loss),
            take_profit: None,
        };

        assert_eq!(policy.levels(&[]), RestoreLevels::NONE);
    }

    #[test]
    fn fixed_levels_ignore_orders() {
        let levels = RestoreLevels {
            stop_loss: Some(dec!(1.09)),
            take_profit: Some(dec!(1.12)),
        };
        assert_eq!(FixedLevels(levels).levels(&[]), levels);
        assert_eq!(NoRestore.levels(&[]), RestoreLevels::NONE);
    }
}
