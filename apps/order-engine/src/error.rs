//! Error handling for the order engine.
//!
//! Every error maps to a stable [`ErrorCode`] whose reason string is used
//! in logs and metrics labels.
//!
//! | Code | Raised when |
//! |------|-------------|
//! | `IMMEDIATE_CALL_FAILURE` | The venue call failed synchronously |
//! | `REJECT_EXHAUSTED` | Every retry attempt was rejected |
//! | `REJECT_NO_RETRY` | A reject arrived and the command has no retries |
//! | `INVALID_CONFIGURATION` | A command or classification was built incorrectly |
//! | `FEED_CLOSED` | The outcome feed shut down while a call was pending |
//! | `FEED_LAGGED` | Outcome events were dropped before a call's result was seen |
//! | `CANCELLED` | The caller cancelled the command |
//! | `POSITION_OPERATION_FAILED` | A position-level merge/close/submit failed |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::VenueError;
use crate::domain::order_execution::{CallReason, ClassificationError, OutcomeEvent};
use crate::domain::position::PositionOperation;
use crate::domain::shared::{InstrumentId, OrderId};

/// Error codes for the order engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Command errors
    /// Venue call failed before it was accepted.
    ImmediateCallFailure,
    /// All attempts rejected.
    RejectExhausted,
    /// Rejected with a zero-retry policy.
    RejectNoRetry,
    /// Invalid command or classification.
    InvalidConfiguration,
    /// Outcome feed closed.
    FeedClosed,
    /// Outcome events were lost to a lagging subscriber.
    FeedLagged,
    /// Cancelled by the caller.
    Cancelled,

    // Position errors
    /// Position operation failed.
    PositionOperationFailed,
}

impl ErrorCode {
    /// Get the error reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ImmediateCallFailure => "IMMEDIATE_CALL_FAILURE",
            Self::RejectExhausted => "REJECT_EXHAUSTED",
            Self::RejectNoRetry => "REJECT_NO_RETRY",
            Self::InvalidConfiguration => "INVALID_CONFIGURATION",
            Self::FeedClosed => "FEED_CLOSED",
            Self::FeedLagged => "FEED_LAGGED",
            Self::Cancelled => "CANCELLED",
            Self::PositionOperationFailed => "POSITION_OPERATION_FAILED",
        }
    }

    /// Returns true if the venue explicitly refused the request.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::RejectExhausted | Self::RejectNoRetry)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Terminal failure of a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The venue call failed synchronously; no outcome was awaited.
    #[error("{reason} call failed immediately: {source}")]
    ImmediateCallFailure {
        /// Call reason.
        reason: CallReason,
        /// Venue failure.
        #[source]
        source: VenueError,
    },

    /// Every attempt was rejected.
    #[error("{reason} rejected for order {} after {attempts} attempts", .event.order)]
    RejectExhausted {
        /// Call reason.
        reason: CallReason,
        /// Number of invocations made.
        attempts: u32,
        /// Last reject event.
        event: Box<OutcomeEvent>,
    },

    /// A reject arrived and the command does not retry.
    #[error("{reason} rejected for order {} ({})", .event.order, .event.kind)]
    RejectNoRetry {
        /// Call reason.
        reason: CallReason,
        /// Reject event.
        event: Box<OutcomeEvent>,
    },

    /// The command could not be built.
    #[error("Invalid command configuration: {message}")]
    Configuration {
        /// What is wrong.
        message: String,
    },

    /// The outcome feed shut down while awaiting events.
    #[error("Outcome feed closed while awaiting {reason} outcome for order {order}")]
    FeedClosed {
        /// Call reason.
        reason: CallReason,
        /// Awaited order.
        order: OrderId,
    },

    /// Events were dropped while awaiting the outcome, so it may have been missed.
    #[error("Outcome feed lagged by {skipped} events while awaiting {reason} outcome for order {order}")]
    FeedLagged {
        /// Call reason.
        reason: CallReason,
        /// Awaited order.
        order: OrderId,
        /// Number of dropped events.
        skipped: u64,
    },

    /// The caller cancelled the command.
    #[error("{reason} command cancelled")]
    Cancelled {
        /// Call reason.
        reason: CallReason,
    },
}

impl CommandError {
    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ImmediateCallFailure { .. } => ErrorCode::ImmediateCallFailure,
            Self::RejectExhausted { .. } => ErrorCode::RejectExhausted,
            Self::RejectNoRetry { .. } => ErrorCode::RejectNoRetry,
            Self::Configuration { .. } => ErrorCode::InvalidConfiguration,
            Self::FeedClosed { .. } => ErrorCode::FeedClosed,
            Self::FeedLagged { .. } => ErrorCode::FeedLagged,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
        }
    }

    /// The reject event that ended the command, if any.
    #[must_use]
    pub fn reject_event(&self) -> Option<&OutcomeEvent> {
        match self {
            Self::RejectExhausted { event, .. } | Self::RejectNoRetry { event, .. } => {
                Some(event.as_ref())
            }
            _ => None,
        }
    }

    /// Missing mandatory builder field.
    #[must_use]
    pub fn missing(field: &str) -> Self {
        Self::Configuration {
            message: format!("{field} is required"),
        }
    }
}

impl From<ClassificationError> for CommandError {
    fn from(err: ClassificationError) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

/// Failure of a position-level operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// A command inside the operation failed. Work already done stands.
    #[error("{operation} on {instrument} failed: {source}")]
    Command {
        /// Position instrument.
        instrument: InstrumentId,
        /// Failed operation.
        operation: PositionOperation,
        /// First command failure.
        #[source]
        source: CommandError,
    },

    /// The operation ended without the event it needed.
    #[error("{operation} on {instrument} ended without a result")]
    Incomplete {
        /// Position instrument.
        instrument: InstrumentId,
        /// Operation.
        operation: PositionOperation,
    },
}

impl PositionError {
    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::PositionOperationFailed
    }

    /// The underlying command failure, if any.
    #[must_use]
    pub const fn command_error(&self) -> Option<&CommandError> {
        match self {
            Self::Command { source, .. } => Some(source),
            Self::Incomplete { .. } => None,
        }
    }
}
