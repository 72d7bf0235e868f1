//! Net direction of a position.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Net direction derived from the signed filled exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionDirection {
    /// Net bought.
    Long,
    /// Net sold.
    Short,
    /// No net exposure.
    Flat,
}

impl PositionDirection {
    /// Direction of a signed exposure.
    #[must_use]
    pub fn from_exposure(exposure: Decimal) -> Self {
        if exposure > Decimal::ZERO {
            Self::Long
        } else if exposure < Decimal::ZERO {
            Self::Short
        } else {
            Self::Flat
        }
    }
}

impl fmt::Display for PositionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Flat => write!(f, "FLAT"),
        }
    }
}
