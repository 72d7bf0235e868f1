//! Venue-side order state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of an order as reported by the venue.
///
/// The engine never transitions this itself; it only reads it through
/// the venue port and reacts to outcome events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Created locally, not yet acknowledged by the venue.
    Created,
    /// Accepted and resting (conditional/limit order not yet filled).
    Opened,
    /// Filled, holding exposure.
    Filled,
    /// Closed (including merged-away orders).
    Closed,
    /// Canceled or rejected before filling.
    Canceled,
}

impl OrderState {
    /// Returns true if the order holds exposure.
    #[must_use]
    pub const fn is_filled(&self) -> bool {
        matches!(self, Self::Filled)
    }

    /// Returns true if the order is resting at the venue.
    #[must_use]
    pub const fn is_opened(&self) -> bool {
        matches!(self, Self::Opened)
    }

    /// Returns true if a close call makes sense for this state.
    #[must_use]
    pub const fn is_closable(&self) -> bool {
        matches!(self, Self::Filled | Self::Opened)
    }

    /// Returns true if the order reached the end of its lifecycle.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Canceled)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Opened => "OPENED",
            Self::Filled => "FILLED",
            Self::Closed => "CLOSED",
            Self::Canceled => "CANCELED",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OrderState::Created, false, false)]
    #[test_case(OrderState::Opened, true, false)]
    #[test_case(OrderState::Filled, true, false)]
    #[test_case(OrderState::Closed, false, true)]
    #[test_case(OrderState::Canceled, false, true)]
    fn closable_and_terminal(state: OrderState, closable: bool, terminal: bool) {
        assert_eq!(state.is_closable(), closable);
        assert_eq!(state.is_terminal(), terminal);
    }

    #[test]
    fn display_is_screaming_case() {
        assert_eq!(OrderState::Filled.to_string(), "FILLED");
    }
}
