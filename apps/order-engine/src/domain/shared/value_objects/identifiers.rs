//! Strongly-typed identifiers for domain entities.
//!
//! Venue orders are compared by the identity the venue assigned to them,
//! never by their current field values.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Venue-assigned identity of an order.");
define_id!(
    InstrumentId,
    "Grouping key of a position (instrument symbol, e.g. EUR/USD)."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_new_and_display() {
        let id = OrderId::new("ord-123");
        assert_eq!(id.as_str(), "ord-123");
        assert_eq!(format!("{id}"), "ord-123");
    }

    #[test]
    fn equality_is_by_identity_string() {
        assert_eq!(OrderId::new("ord-1"), OrderId::from("ord-1"));
        assert_ne!(OrderId::new("ord-1"), OrderId::new("ord-2"));
    }

    #[test]
    fn instrument_id_from_string() {
        let id: InstrumentId = String::from("EUR/USD").into();
        assert_eq!(id.as_str(), "EUR/USD");
    }

    #[test]
    fn serde_is_transparent() {
        let id = OrderId::new("ord-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ord-123\"");

        let parsed: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn hash_works_for_collections() {
        use std::collections::HashSet;
        let set: HashSet<OrderId> = ["ord-1", "ord-2", "ord-1"]
            .into_iter()
            .map(OrderId::new)
            .collect();

        assert_eq!(set.len(), 2);
    }
}
