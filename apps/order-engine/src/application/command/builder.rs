//! Validating command builder.

use std::fmt;
use std::sync::Arc;

use super::{Command, CommandHooks, CommandTarget, Precondition, RetryPolicy};
use crate::application::ports::{VenueAction, VenueError};
use crate::domain::order_execution::{
    CallReason, EventClassification, OutcomeEvent, OutcomeKind,
};
use crate::domain::shared::OrderId;
use crate::error::CommandError;

/// Accumulates the parts of a [`Command`].
///
/// `action` and `classification` are mandatory. The target defaults to the
/// order the action returns, the retry policy to no retry and every hook
/// to a no-op.
#[must_use]
pub struct CommandBuilder {
    reason: CallReason,
    action: Option<VenueAction>,
    target: CommandTarget,
    classification: Option<EventClassification>,
    retry: RetryPolicy,
    hooks: CommandHooks,
    precondition: Option<Precondition>,
}

impl CommandBuilder {
    /// Create an empty builder.
    pub fn new(reason: CallReason) -> Self {
        Self {
            reason,
            action: None,
            target: CommandTarget::FromAction,
            classification: None,
            retry: RetryPolicy::none(),
            hooks: CommandHooks::default(),
            precondition: None,
        }
    }

    /// Set the venue call.
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn() -> Result<OrderId, VenueError> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Correlate events against a known order.
    pub fn target(mut self, order: OrderId) -> Self {
        self.target = CommandTarget::Known(order);
        self
    }

    /// Set the event classification.
    pub fn classification(mut self, classification: EventClassification) -> Self {
        self.classification = Some(classification);
        self
    }

    /// Use the static classification table of the builder's call reason.
    pub fn default_classification(self) -> Self {
        let classification = EventClassification::for_reason(self.reason);
        self.classification(classification)
    }

    /// Set the retry policy.
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run once when the command activates.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.on_start = Some(Arc::new(hook));
        self
    }

    /// Run for every forwarded event.
    pub fn on_event<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OutcomeEvent) + Send + Sync + 'static,
    {
        self.hooks.on_event = Some(Arc::new(hook));
        self
    }

    /// Run for the done event.
    pub fn on_done<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OutcomeEvent) + Send + Sync + 'static,
    {
        self.hooks.on_done = Some(Arc::new(hook));
        self
    }

    /// Run for every reject event, including ones followed by a retry.
    pub fn on_reject<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OutcomeEvent) + Send + Sync + 'static,
    {
        self.hooks.on_reject = Some(Arc::new(hook));
        self
    }

    /// Run for partial fill and partial close events.
    pub fn on_partial<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OutcomeEvent) + Send + Sync + 'static,
    {
        let hook: Arc<dyn Fn(&OutcomeEvent) + Send + Sync> = Arc::new(hook);
        self.hooks
            .add_kind_hook(OutcomeKind::PartialFillOk, Arc::clone(&hook));
        self.hooks.add_kind_hook(OutcomeKind::PartialCloseOk, hook);
        self
    }

    /// Run for events of one kind.
    pub fn on_kind<F>(mut self, kind: OutcomeKind, hook: F) -> Self
    where
        F: Fn(&OutcomeEvent) + Send + Sync + 'static,
    {
        self.hooks.add_kind_hook(kind, Arc::new(hook));
        self
    }

    /// Run when the command fails. Not run on cancellation.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CommandError) + Send + Sync + 'static,
    {
        self.hooks.on_error = Some(Arc::new(hook));
        self
    }

    /// Skip the command when `check` returns false at activation.
    pub fn run_if<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.precondition = Some(Arc::new(check));
        self
    }

    /// Build the command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Configuration`] if the action or the
    /// classification is missing.
    pub fn build(self) -> Result<Command, CommandError> {
        let action = self.action.ok_or_else(|| CommandError::missing("action"))?;
        let classification = self
            .classification
            .ok_or_else(|| CommandError::missing("classification"))?;

        Ok(Command {
            reason: self.reason,
            action,
            target: self.target,
            classification,
            retry: self.retry,
            hooks: self.hooks,
            precondition: self.precondition,
        })
    }
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("reason", &self.reason)
            .field("action", &self.action.is_some())
            .field("target", &self.target)
            .field("classification", &self.classification)
            .field("retry", &self.retry)
            .field("hooks", &self.hooks)
            .field("precondition", &self.precondition.is_some())
            .finish()
    }
}
