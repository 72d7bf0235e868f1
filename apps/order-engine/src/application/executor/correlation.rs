//! Correlation state machine.
//!
//! ```text
//! NotStarted -> Invoking -> Awaiting -> (Retrying -> Invoking)* -> Finished
//!                   |           |
//!                   +-----------+--> Failing -> Finished
//! ```
//!
//! Each poll of the owning stream advances the machine until it has an
//! item to deliver. Correlation is purely by order identity: events for
//! other orders are skipped without touching hooks. A lagging receiver
//! fails the command, since the dropped events may include its result.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::stream::CommandItem;
use crate::application::command::Command;
use crate::application::ports::{ExecutionContext, OutcomeFeed};
use crate::domain::order_execution::{CallRequest, Classification, OutcomeEvent};
use crate::error::CommandError;
use crate::observability::{
    record_command_invocation, record_command_outcome, record_command_retry,
};

/// Call registration removed from the feed ledger when dropped.
struct Registration {
    feed: Arc<OutcomeFeed>,
    request: CallRequest,
}

impl Registration {
    fn new(feed: Arc<OutcomeFeed>, request: CallRequest) -> Self {
        feed.register(request.clone());
        Self { feed, request }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.feed.unregister(&self.request);
    }
}

enum Phase {
    NotStarted,
    Invoking,
    Awaiting {
        receiver: broadcast::Receiver<OutcomeEvent>,
        registration: Registration,
    },
    Retrying,
    Failing(CommandError),
    Finished,
}

pub(super) struct Correlation {
    command: Command,
    feed: Arc<OutcomeFeed>,
    context: ExecutionContext,
    token: CancellationToken,
    invocations: u32,
    started: Option<Instant>,
    phase: Phase,
}

impl Correlation {
    pub(super) fn new(
        command: Command,
        feed: Arc<OutcomeFeed>,
        context: ExecutionContext,
        token: CancellationToken,
    ) -> Self {
        Self {
            command,
            feed,
            context,
            token,
            invocations: 0,
            started: None,
            phase: Phase::NotStarted,
        }
    }

    /// Advance until the next item, or `None` once finished.
    pub(super) async fn step(mut self) -> Option<(CommandItem, Self)> {
        let reason = self.command.reason();

        loop {
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::NotStarted => {
                    if self.token.is_cancelled() {
                        return Some(self.cancelled());
                    }
                    if !self.command.should_run() {
                        tracing::debug!(reason = %reason, "Precondition not met, command skipped");
                        record_command_outcome(reason.as_str(), "skipped", 0.0);
                        return None;
                    }
                    self.started = Some(Instant::now());
                    self.command.hooks().started();
                    self.phase = Phase::Invoking;
                }

                Phase::Invoking => {
                    self.invocations += 1;
                    record_command_invocation(reason.as_str());

                    // Subscribe first: the outcome may be published before the call returns.
                    let receiver = self.feed.subscribe();
                    let action = Arc::clone(self.command.action());

                    let result = tokio::select! {
                        biased;
                        () = self.token.cancelled() => return Some(self.cancelled()),
                        result = self.context.run(action) => result,
                    };

                    match result {
                        Ok(returned) => {
                            let order = self.command.target().resolve(returned);
                            tracing::debug!(
                                reason = %reason,
                                order_id = %order,
                                attempt = self.invocations,
                                "Venue call accepted, awaiting outcome"
                            );
                            let registration = Registration::new(
                                Arc::clone(&self.feed),
                                CallRequest::new(order, reason),
                            );
                            self.phase = Phase::Awaiting {
                                receiver,
                                registration,
                            };
                        }
                        Err(source) => {
                            drop(receiver);
                            tracing::warn!(
                                reason = %reason,
                                attempt = self.invocations,
                                error = %source,
                                "Venue call failed immediately"
                            );
                            self.phase =
                                Phase::Failing(CommandError::ImmediateCallFailure { reason, source });
                        }
                    }
                }

                Phase::Awaiting {
                    mut receiver,
                    registration,
                } => {
                    let received = tokio::select! {
                        biased;
                        () = self.token.cancelled() => return Some(self.cancelled()),
                        received = receiver.recv() => received,
                    };

                    let event = match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            let order = registration.request.order.clone();
                            tracing::warn!(
                                reason = %reason,
                                order_id = %order,
                                skipped,
                                "Outcome feed lagged, result may have been dropped"
                            );
                            self.phase = Phase::Failing(CommandError::FeedLagged {
                                reason,
                                order,
                                skipped,
                            });
                            continue;
                        }
                        Err(RecvError::Closed) => {
                            let order = registration.request.order.clone();
                            self.phase = Phase::Failing(CommandError::FeedClosed { reason, order });
                            continue;
                        }
                    };

                    if event.order != registration.request.order {
                        self.phase = Phase::Awaiting {
                            receiver,
                            registration,
                        };
                        continue;
                    }

                    let classification = self.command.classification().classify(event.kind);
                    match classification {
                        Classification::Ignored => {
                            tracing::trace!(
                                reason = %reason,
                                order_id = %event.order,
                                kind = %event.kind,
                                "Ignoring unclassified outcome"
                            );
                            self.phase = Phase::Awaiting {
                                receiver,
                                registration,
                            };
                        }
                        Classification::Other => {
                            self.command.hooks().forwarded(&event, classification);
                            self.phase = Phase::Awaiting {
                                receiver,
                                registration,
                            };
                            return Some((Ok(event), self));
                        }
                        Classification::Done => {
                            drop(registration);
                            self.command.hooks().forwarded(&event, classification);
                            tracing::debug!(
                                reason = %reason,
                                order_id = %event.order,
                                kind = %event.kind,
                                attempt = self.invocations,
                                "Command done"
                            );
                            record_command_outcome(reason.as_str(), "done", self.elapsed());
                            return Some((Ok(event), self));
                        }
                        Classification::Reject => {
                            drop(registration);
                            self.command.hooks().forwarded(&event, classification);
                            self.phase = self.after_reject(&event);
                            return Some((Ok(event), self));
                        }
                    }
                }

                Phase::Retrying => {
                    let delay = self.command.retry().delay;
                    record_command_retry(reason.as_str());
                    tracing::info!(
                        reason = %reason,
                        attempt = self.invocations + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying rejected call"
                    );
                    tokio::select! {
                        biased;
                        () = self.token.cancelled() => return Some(self.cancelled()),
                        () = tokio::time::sleep(delay) => {}
                    }
                    self.phase = Phase::Invoking;
                }

                Phase::Failing(error) => {
                    self.command.hooks().failed(&error);
                    record_command_outcome(reason.as_str(), error.code().reason(), self.elapsed());
                    return Some((Err(error), self));
                }

                Phase::Finished => return None,
            }
        }
    }

    fn after_reject(&self, event: &OutcomeEvent) -> Phase {
        let reason = self.command.reason();
        let retry = self.command.retry();

        tracing::warn!(
            reason = %reason,
            order_id = %event.order,
            kind = %event.kind,
            attempt = self.invocations,
            max_attempts = retry.max_attempts,
            "Call rejected"
        );

        if retry.max_attempts == 0 {
            Phase::Failing(CommandError::RejectNoRetry {
                reason,
                event: Box::new(event.clone()),
            })
        } else if retry.allows_retry(self.invocations) {
            Phase::Retrying
        } else {
            Phase::Failing(CommandError::RejectExhausted {
                reason,
                attempts: self.invocations,
                event: Box::new(event.clone()),
            })
        }
    }

    fn cancelled(mut self) -> (CommandItem, Self) {
        let reason = self.command.reason();
        self.phase = Phase::Finished;
        tracing::debug!(reason = %reason, attempt = self.invocations, "Command cancelled");
        record_command_outcome(reason.as_str(), "cancelled", self.elapsed());
        (Err(CommandError::Cancelled { reason }), self)
    }

    fn elapsed(&self) -> f64 {
        self.started
            .map_or(0.0, |started| started.elapsed().as_secs_f64())
    }
}
