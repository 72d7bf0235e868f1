//! Notifications published by a position.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::OrderId;

/// Operation a position runs against its orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionOperation {
    /// Submit a new order.
    Submit,
    /// Merge idle filled orders.
    Merge,
    /// Close idle filled or opened orders.
    Close,
}

impl PositionOperation {
    /// Stable lowercase name, used as a metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Merge => "merge",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for PositionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position-level notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionEvent {
    /// A submitted order filled and joined the position.
    Submitted {
        /// The new order.
        order: OrderId,
    },
    /// A merge produced a new order.
    Merged {
        /// The merged order.
        order: OrderId,
    },
    /// A close operation completed.
    Closed,
    /// A structural operation was refused because another one is running.
    Busy {
        /// Refused operation.
        operation: PositionOperation,
    },
    /// An operation failed.
    Failed {
        /// Failed operation.
        operation: PositionOperation,
        /// Error description.
        reason: String,
    },
}
