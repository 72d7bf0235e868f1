//! Command Executor
//!
//! Turns a [`Command`] plus the shared outcome feed into a terminating,
//! retryable asynchronous operation. The executor is cheap to clone and
//! holds no per-command state; every call to [`CommandExecutor::execute`]
//! gets its own correlation state machine.

mod correlation;
mod stream;

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub use stream::{CommandItem, CommandStream};

use self::correlation::Correlation;
use crate::application::command::{Command, CommandBuilder};
use crate::application::ports::{ExecutionContext, OutcomeFeed};

/// Executes commands against the shared outcome feed.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    feed: Arc<OutcomeFeed>,
    context: ExecutionContext,
}

impl CommandExecutor {
    /// Create an executor.
    #[must_use]
    pub const fn new(feed: Arc<OutcomeFeed>, context: ExecutionContext) -> Self {
        Self { feed, context }
    }

    /// The shared outcome feed.
    #[must_use]
    pub const fn feed(&self) -> &Arc<OutcomeFeed> {
        &self.feed
    }

    /// Execution context used for venue calls.
    #[must_use]
    pub const fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Execute a command. Nothing happens until the stream is polled.
    pub fn execute(&self, command: Command) -> CommandStream {
        self.execute_with_cancellation(command, CancellationToken::new())
    }

    /// Execute a command that stops with [`CommandError::Cancelled`] once
    /// `token` is cancelled.
    ///
    /// [`CommandError::Cancelled`]: crate::error::CommandError::Cancelled
    pub fn execute_with_cancellation(
        &self,
        command: Command,
        token: CancellationToken,
    ) -> CommandStream {
        let correlation = Correlation::new(command, Arc::clone(&self.feed), self.context, token);
        CommandStream::from_stream(futures::stream::unfold(correlation, Correlation::step).boxed())
    }

    /// Build and execute a command. A build error is delivered on the stream.
    pub fn run(&self, builder: CommandBuilder) -> CommandStream {
        match builder.build() {
            Ok(command) => self.execute(command),
            Err(error) => CommandStream::failed(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::RetryPolicy;
    use crate::application::ports::VenueError;
    use crate::domain::order_execution::{CallReason, OutcomeEvent, OutcomeKind};
    use crate::domain::shared::OrderId;
    use crate::error::CommandError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn executor() -> (CommandExecutor, Arc<OutcomeFeed>) {
        let feed = Arc::new(OutcomeFeed::default());
        (CommandExecutor::new(Arc::clone(&feed), ExecutionContext::Inline), feed)
    }

    /// Close builder whose action publishes `script[n]` on the n-th call.
    fn scripted_close(
        feed: &Arc<OutcomeFeed>,
        order: &str,
        script: Vec<Vec<OutcomeKind>>,
        calls: &Arc<AtomicU32>,
    ) -> CommandBuilder {
        let feed = Arc::clone(feed);
        let calls = Arc::clone(calls);
        let order = OrderId::new(order);
        let target = order.clone();
        CommandBuilder::new(CallReason::Close)
            .target(target)
            .default_classification()
            .action(move || {
                let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
                for kind in script.get(n).cloned().unwrap_or_default() {
                    feed.publish(OutcomeEvent::new(order.clone(), kind));
                }
                Ok(order.clone())
            })
    }

    #[tokio::test]
    async fn done_after_other_events_terminates_once() {
        let (executor, feed) = executor();
        let calls = Arc::new(AtomicU32::new(0));
        let builder = scripted_close(
            &feed,
            "ord-1",
            vec![vec![
                OutcomeKind::PartialCloseOk,
                OutcomeKind::ChangedSl,
                OutcomeKind::CloseOk,
                OutcomeKind::Notification,
            ]],
            &calls,
        );

        let events = executor.run(builder).collect_events().await.unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();

        assert_eq!(kinds, vec![OutcomeKind::PartialCloseOk, OutcomeKind::CloseOk]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(feed.in_flight(&OrderId::new("ord-1")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn every_attempt_rejected_exhausts_retries() {
        let (executor, feed) = executor();
        let calls = Arc::new(AtomicU32::new(0));
        let script = vec![vec![OutcomeKind::CloseRejected]; 4];
        let builder = scripted_close(&feed, "ord-1", script, &calls)
            .retry(RetryPolicy::new(3, Duration::from_millis(100)));

        let result = executor.run(builder).finish().await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(matches!(
            result,
            Err(CommandError::RejectExhausted { attempts: 4, .. })
        ));
    }

    #[tokio::test]
    async fn reject_without_retry_fails_immediately() {
        let (executor, feed) = executor();
        let calls = Arc::new(AtomicU32::new(0));
        let builder = scripted_close(&feed, "ord-1", vec![vec![OutcomeKind::CloseRejected]], &calls);

        let result = executor.run(builder).finish().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let error = result.unwrap_err();
        assert!(matches!(error, CommandError::RejectNoRetry { .. }));
        assert_eq!(error.reject_event().map(|e| e.kind), Some(OutcomeKind::CloseRejected));
    }

    #[tokio::test]
    async fn immediate_failure_skips_correlation_and_runs_error_hook() {
        let (executor, feed) = executor();
        let errors = Arc::new(AtomicU32::new(0));
        let hook_errors = Arc::clone(&errors);
        let builder = CommandBuilder::new(CallReason::Close)
            .target(OrderId::new("ord-1"))
            .default_classification()
            .retry(RetryPolicy::new(5, Duration::from_millis(10)))
            .action(|| {
                Err(VenueError::CallRejected {
                    reason: "order is locked".to_string(),
                })
            })
            .on_error(move |_| {
                hook_errors.fetch_add(1, Ordering::SeqCst);
            });

        let result = executor.run(builder).finish().await;

        assert!(matches!(result, Err(CommandError::ImmediateCallFailure { .. })));
        assert_eq!(feed.registration_count(), 0);
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn precondition_false_skips_without_calls_or_hooks() {
        let (executor, feed) = executor();
        let calls = Arc::new(AtomicU32::new(0));
        let started = Arc::new(AtomicU32::new(0));
        let hook_started = Arc::clone(&started);
        let builder = scripted_close(&feed, "ord-1", vec![vec![OutcomeKind::CloseOk]], &calls)
            .run_if(|| false)
            .on_start(move || {
                hook_started.fetch_add(1, Ordering::SeqCst);
            });

        let result = executor.run(builder).finish().await;

        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stream_is_cold_until_polled() {
        let (executor, feed) = executor();
        let calls = Arc::new(AtomicU32::new(0));
        let builder = scripted_close(&feed, "ord-1", vec![vec![OutcomeKind::CloseOk]], &calls);

        let stream = executor.run(builder);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        stream.finish().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn events_for_other_orders_never_reach_hooks() {
        let (executor, feed) = executor();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook_seen = Arc::clone(&seen);
        let publisher = Arc::clone(&feed);

        let builder = CommandBuilder::new(CallReason::ChangeStopLoss)
            .target(OrderId::new("mine"))
            .default_classification()
            .action(move || {
                publisher.publish(OutcomeEvent::new(OrderId::new("other"), OutcomeKind::ChangedSl));
                publisher.publish(OutcomeEvent::new(OrderId::new("mine"), OutcomeKind::ChangedSl));
                Ok(OrderId::new("mine"))
            })
            .on_event(move |event| {
                hook_seen.lock().unwrap().push(event.order.clone());
            });

        executor.run(builder).finish().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![OrderId::new("mine")]);
    }

    #[tokio::test]
    async fn cancellation_ends_with_cancelled_and_no_hooks() {
        let (executor, _feed) = executor();
        let errors = Arc::new(AtomicU32::new(0));
        let hook_errors = Arc::clone(&errors);
        let command = CommandBuilder::new(CallReason::Close)
            .target(OrderId::new("ord-1"))
            .default_classification()
            .action(|| Ok(OrderId::new("ord-1")))
            .on_error(move |_| {
                hook_errors.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let token = CancellationToken::new();
        let stream = executor.execute_with_cancellation(command, token.clone());
        let handle = tokio::spawn(stream.finish());

        tokio::task::yield_now().await;
        token.cancel();

        let result = handle.await.unwrap();
        assert_eq!(
            result,
            Err(CommandError::Cancelled {
                reason: CallReason::Close
            })
        );
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_during_retry_delay_stops_further_calls() {
        let (executor, feed) = executor();
        let calls = Arc::new(AtomicU32::new(0));
        let errors = Arc::new(AtomicU32::new(0));
        let hook_errors = Arc::clone(&errors);
        let command = scripted_close(&feed, "ord-1", vec![vec![OutcomeKind::CloseRejected]], &calls)
            .retry(RetryPolicy::new(3, Duration::from_secs(5)))
            .on_error(move |_| {
                hook_errors.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let token = CancellationToken::new();
        let handle = tokio::spawn(
            executor
                .execute_with_cancellation(command, token.clone())
                .finish(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        let result = handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(
            result,
            Err(CommandError::Cancelled {
                reason: CallReason::Close
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lagged_feed_fails_instead_of_waiting_forever() {
        let feed = Arc::new(OutcomeFeed::new(2));
        let executor = CommandExecutor::new(Arc::clone(&feed), ExecutionContext::Inline);
        let publisher = Arc::clone(&feed);
        let builder = CommandBuilder::new(CallReason::Close)
            .target(OrderId::new("ord-1"))
            .default_classification()
            .action(move || {
                publisher.publish(OutcomeEvent::new(OrderId::new("ord-1"), OutcomeKind::CloseOk));
                for _ in 0..3 {
                    publisher.publish(OutcomeEvent::new(
                        OrderId::new("other"),
                        OutcomeKind::Notification,
                    ));
                }
                Ok(OrderId::new("ord-1"))
            });

        let result = tokio::time::timeout(Duration::from_secs(2), executor.run(builder).finish())
            .await
            .expect("command must terminate");

        let Err(error) = result else {
            panic!("expected a lag failure, got {result:?}");
        };
        assert!(matches!(
            error,
            CommandError::FeedLagged {
                reason: CallReason::Close,
                ..
            }
        ));
        assert_eq!(error.code(), crate::error::ErrorCode::FeedLagged);
        assert_eq!(feed.in_flight(&OrderId::new("ord-1")), None);
    }

    #[tokio::test]
    async fn missing_classification_is_delivered_on_stream() {
        let (executor, _feed) = executor();
        let builder = CommandBuilder::new(CallReason::Close).action(|| Ok(OrderId::new("a")));

        let result = executor.run(builder).finish().await;

        assert!(matches!(result, Err(CommandError::Configuration { .. })));
    }
}
