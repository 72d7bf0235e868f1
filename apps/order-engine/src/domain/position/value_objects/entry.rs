//! Position membership entries.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{OrderId, Timestamp};

/// Whether an entry is available or fenced by a structural operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingState {
    /// Available for a new structural operation.
    #[default]
    Idle,
    /// Taking part in a merge or close.
    Active,
}

/// One order belonging to a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEntry {
    /// The order.
    pub order: OrderId,
    /// Processing state.
    pub state: ProcessingState,
    /// When the order joined the position.
    pub admitted_at: Timestamp,
}

impl PositionEntry {
    /// Create an idle entry admitted now.
    #[must_use]
    pub fn idle(order: OrderId) -> Self {
        Self {
            order,
            state: ProcessingState::Idle,
            admitted_at: Timestamp::now(),
        }
    }

    /// Returns true if the entry is available.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == ProcessingState::Idle
    }
}
