//! Command executor scenarios against the paper venue.
//!
//! Covers retry timing, immediate failures, isolation between concurrent
//! commands, and termination on the first done event.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use rust_decimal_macros::dec;
use tokio::time::Instant;

use order_engine::application::command::{CommandBuilder, RetryPolicy};
use order_engine::application::ports::{ExecutionContext, OutcomeFeed, Venue, VenueError};
use order_engine::application::{CommandExecutor, OrderCommands};
use order_engine::domain::order_execution::{
    CallReason, OrderParams, OrderSide, OrderSnapshot, OrderState, OutcomeEvent, OutcomeKind,
};
use order_engine::domain::shared::{InstrumentId, OrderId};
use order_engine::error::CommandError;
use order_engine::infrastructure::venue::{PaperVenue, Scripted, VenueCall};

struct Harness {
    feed: Arc<OutcomeFeed>,
    venue: Arc<PaperVenue>,
    commands: OrderCommands,
    executor: CommandExecutor,
}

impl Harness {
    fn new() -> Self {
        Self::with_retry(RetryPolicy::none())
    }

    fn with_retry(retry: RetryPolicy) -> Self {
        let feed = Arc::new(OutcomeFeed::default());
        let venue = Arc::new(PaperVenue::new(Arc::clone(&feed)));
        Self {
            commands: OrderCommands::new(venue.clone(), retry),
            executor: CommandExecutor::new(Arc::clone(&feed), ExecutionContext::Inline),
            feed,
            venue,
        }
    }

    fn seed(&self, id: &str) -> OrderId {
        let order = OrderId::new(id);
        self.venue.seed(OrderSnapshot {
            id: order.clone(),
            instrument: InstrumentId::new("EUR/USD"),
            label: id.to_string(),
            side: OrderSide::Buy,
            state: OrderState::Filled,
            amount: dec!(1),
            open_price: Some(dec!(1.1)),
            stop_loss: None,
            take_profit: None,
            good_till: None,
        });
        order
    }

    fn calls_with(&self, reason: CallReason) -> usize {
        self.venue
            .calls()
            .iter()
            .filter(|call| call.reason() == reason)
            .count()
    }
}

#[tokio::test(start_paused = true)]
async fn two_rejects_then_done_with_two_retries_invokes_three_times() {
    let harness = Harness::with_retry(RetryPolicy::new(2, Duration::from_millis(500)));
    let order = harness.seed("A");
    harness.venue.script(CallReason::ChangeStopLoss, Scripted::Reject);
    harness.venue.script(CallReason::ChangeStopLoss, Scripted::Reject);

    let rejects = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&rejects);
    let builder = harness
        .commands
        .set_stop_loss(&order, Some(dec!(1.05)))
        .on_reject(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

    let started = Instant::now();
    let events = harness.executor.run(builder).collect_events().await.unwrap();

    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            OutcomeKind::ChangeSlRejected,
            OutcomeKind::ChangeSlRejected,
            OutcomeKind::ChangedSl
        ]
    );
    assert_eq!(harness.calls_with(CallReason::ChangeStopLoss), 3);
    assert_eq!(rejects.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(harness.venue.order(&order).unwrap().stop_loss, Some(dec!(1.05)));
}

#[tokio::test(start_paused = true)]
async fn rejects_beyond_retry_budget_fail_with_exhausted() {
    let harness = Harness::with_retry(RetryPolicy::new(1, Duration::from_millis(200)));
    let order = harness.seed("A");
    for _ in 0..3 {
        harness.venue.script(CallReason::Close, Scripted::Reject);
    }

    let result = harness.executor.run(harness.commands.close(&order)).finish().await;

    let Err(CommandError::RejectExhausted { attempts, event, .. }) = result else {
        panic!("expected exhausted retries, got {result:?}");
    };
    assert_eq!(attempts, 2);
    assert_eq!(event.kind, OutcomeKind::CloseRejected);
    assert_eq!(harness.calls_with(CallReason::Close), 2);
    assert_eq!(harness.feed.in_flight(&order), None);
}

#[tokio::test]
async fn immediate_failure_never_registers_or_retries() {
    let harness = Harness::with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    let order = harness.seed("A");
    harness.venue.script(
        CallReason::Close,
        Scripted::Fail(VenueError::Unavailable {
            message: "session dropped".to_string(),
        }),
    );

    let result = harness.executor.run(harness.commands.close(&order)).finish().await;

    assert!(matches!(
        result,
        Err(CommandError::ImmediateCallFailure {
            reason: CallReason::Close,
            ..
        })
    ));
    assert_eq!(harness.calls_with(CallReason::Close), 1);
    // The receiver opened before the call is already gone, and nothing was registered.
    assert_eq!(harness.feed.registration_count(), 0);
    assert_eq!(harness.feed.subscriber_count(), 0);
}

#[tokio::test]
async fn concurrent_commands_only_see_their_own_events() {
    let harness = Harness::new();
    let a = harness.seed("A");
    let b = harness.seed("B");

    let seen_a = Arc::new(Mutex::new(Vec::new()));
    let seen_b = Arc::new(Mutex::new(Vec::new()));
    let (hook_a, hook_b) = (Arc::clone(&seen_a), Arc::clone(&seen_b));

    let first = harness.executor.run(
        harness
            .commands
            .set_take_profit(&a, Some(dec!(1.3)))
            .on_event(move |event| hook_a.lock().unwrap().push(event.order.clone())),
    );
    let second = harness.executor.run(
        harness
            .commands
            .set_take_profit(&b, Some(dec!(1.4)))
            .on_event(move |event| hook_b.lock().unwrap().push(event.order.clone())),
    );

    let (first, second) = tokio::join!(first.finish(), second.finish());

    assert_eq!(first.unwrap().map(|e| e.order), Some(a.clone()));
    assert_eq!(second.unwrap().map(|e| e.order), Some(b.clone()));
    assert_eq!(*seen_a.lock().unwrap(), vec![a]);
    assert_eq!(*seen_b.lock().unwrap(), vec![b]);
}

#[tokio::test]
async fn nothing_is_delivered_after_done() {
    let harness = Harness::new();
    let order = OrderId::new("A");
    let feed = Arc::clone(&harness.feed);
    let target = order.clone();
    let events_seen = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&events_seen);

    let builder = CommandBuilder::new(CallReason::Close)
        .target(order.clone())
        .default_classification()
        .action(move || {
            for kind in [
                OutcomeKind::PartialCloseOk,
                OutcomeKind::CloseOk,
                OutcomeKind::PartialCloseOk,
                OutcomeKind::CloseRejected,
            ] {
                feed.publish(OutcomeEvent::new(target.clone(), kind));
            }
            Ok(target.clone())
        })
        .on_event(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let mut stream = harness.executor.run(builder);
    let mut kinds = Vec::new();
    while let Some(item) = stream.next().await {
        kinds.push(item.unwrap().kind);
    }

    assert_eq!(kinds, vec![OutcomeKind::PartialCloseOk, OutcomeKind::CloseOk]);
    assert_eq!(events_seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn value_already_set_skips_the_venue() {
    let harness = Harness::new();
    let order = harness.seed("A");

    let result = harness
        .executor
        .run(harness.commands.set_stop_loss(&order, None))
        .finish()
        .await;

    assert_eq!(result, Ok(None));
    assert!(harness.venue.calls().is_empty());
}

#[tokio::test]
async fn submit_correlates_against_the_new_order() {
    let harness = Harness::new();
    let params = OrderParams::market(
        "entry",
        InstrumentId::new("EUR/USD"),
        OrderSide::Sell,
        dec!(2),
    );

    let done = harness
        .executor
        .run(harness.commands.submit(params))
        .finish()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(done.kind, OutcomeKind::FullFillOk);
    assert!(matches!(
        harness.venue.calls().as_slice(),
        [VenueCall::Submit { label }] if label == "entry"
    ));
    assert_eq!(
        harness.venue.order(&done.order).map(|o| o.state),
        Some(OrderState::Filled)
    );
}
