//! Commands
//!
//! A [`Command`] is an immutable description of one venue operation: the
//! blocking call to make, which order's events answer it, how to classify
//! those events, how often to retry a rejection and which hooks to run.
//! Building a command has no side effects; nothing reaches the venue until
//! the stream returned by the executor is polled.

mod builder;
mod hooks;
mod retry;

use std::fmt;
use std::sync::Arc;

pub use builder::CommandBuilder;
pub use hooks::{CommandHooks, ErrorHook, EventHook, StartHook};
pub use retry::RetryPolicy;

use crate::application::ports::VenueAction;
use crate::domain::order_execution::{CallReason, EventClassification};
use crate::domain::shared::OrderId;

/// Check run at activation; `false` skips the command.
pub type Precondition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Which order's events answer the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTarget {
    /// The order is known before the call.
    Known(OrderId),
    /// The order is the one returned by the call (submit, merge).
    FromAction,
}

impl CommandTarget {
    /// Resolve the target given the identity the action returned.
    #[must_use]
    pub fn resolve(&self, returned: OrderId) -> OrderId {
        match self {
            Self::Known(order) => order.clone(),
            Self::FromAction => returned,
        }
    }
}

/// Immutable description of one venue operation.
#[derive(Clone)]
pub struct Command {
    reason: CallReason,
    action: VenueAction,
    target: CommandTarget,
    classification: EventClassification,
    retry: RetryPolicy,
    hooks: CommandHooks,
    precondition: Option<Precondition>,
}

impl Command {
    /// Start building a command.
    #[must_use]
    pub fn builder(reason: CallReason) -> CommandBuilder {
        CommandBuilder::new(reason)
    }

    /// Call reason.
    #[must_use]
    pub const fn reason(&self) -> CallReason {
        self.reason
    }

    /// The venue call.
    #[must_use]
    pub const fn action(&self) -> &VenueAction {
        &self.action
    }

    /// Target resolution.
    #[must_use]
    pub const fn target(&self) -> &CommandTarget {
        &self.target
    }

    /// Event classification.
    #[must_use]
    pub const fn classification(&self) -> &EventClassification {
        &self.classification
    }

    /// Retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Lifecycle hooks.
    #[must_use]
    pub const fn hooks(&self) -> &CommandHooks {
        &self.hooks
    }

    /// Returns false if the command should be skipped.
    #[must_use]
    pub fn should_run(&self) -> bool {
        self.precondition.as_ref().is_none_or(|check| check())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("reason", &self.reason)
            .field("target", &self.target)
            .field("classification", &self.classification)
            .field("retry", &self.retry)
            .field("hooks", &self.hooks)
            .field("precondition", &self.precondition.is_some())
            .finish_non_exhaustive()
    }
}
