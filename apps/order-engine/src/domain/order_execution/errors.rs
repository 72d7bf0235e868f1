//! Order execution domain errors.

use std::fmt;

use super::events::OutcomeKind;

/// Errors raised while building domain rules for order calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// The same kind was placed in two buckets.
    Overlap {
        /// Offending kind.
        kind: OutcomeKind,
        /// First bucket containing it.
        first: &'static str,
        /// Second bucket containing it.
        second: &'static str,
    },

    /// No done kinds were given, so a call could never complete.
    NoDoneKinds,
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap {
                kind,
                first,
                second,
            } => write!(f, "Outcome kind {kind} is both {first} and {second}"),
            Self::NoDoneKinds => write!(f, "Classification has no done kinds"),
        }
    }
}

impl std::error::Error for ClassificationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_display_names_both_buckets() {
        let err = ClassificationError::Overlap {
            kind: OutcomeKind::CloseOk,
            first: "done",
            second: "reject",
        };
        assert_eq!(err.to_string(), "Outcome kind CLOSE_OK is both done and reject");
    }
}
