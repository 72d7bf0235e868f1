//! Outcome Feed
//!
//! Process-wide broadcast of venue outcome events plus the ledger of calls
//! whose outcome is still pending. Events are fanned out to every
//! subscriber in publish order; no subscriber can mutate the stream.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::domain::order_execution::{CallReason, CallRequest, OutcomeEvent};
use crate::domain::shared::OrderId;

/// Default number of events buffered per subscriber.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// Shared multi-subscriber outcome event feed.
#[derive(Debug)]
pub struct OutcomeFeed {
    sender: broadcast::Sender<OutcomeEvent>,
    in_flight: Mutex<HashMap<OrderId, CallReason>>,
    registrations: AtomicU64,
}

impl OutcomeFeed {
    /// Create a feed buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            in_flight: Mutex::new(HashMap::new()),
            registrations: AtomicU64::new(0),
        }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Returns the number of subscribers that received it. Events
    /// published while nobody listens are dropped.
    pub fn publish(&self, event: OutcomeEvent) -> usize {
        tracing::trace!(order_id = %event.order, kind = %event.kind, "Outcome event published");
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OutcomeEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Record a call whose outcome is awaited.
    pub fn register(&self, request: CallRequest) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
        self.ledger().insert(request.order, request.reason);
    }

    /// Forget a call, if it is still the one recorded for its order.
    pub fn unregister(&self, request: &CallRequest) {
        let mut ledger = self.ledger();
        if ledger.get(&request.order) == Some(&request.reason) {
            ledger.remove(&request.order);
        }
    }

    /// Reason of the call currently awaited for `order`.
    #[must_use]
    pub fn in_flight(&self, order: &OrderId) -> Option<CallReason> {
        self.ledger().get(order).copied()
    }

    /// Total number of registrations since creation.
    ///
    /// Commands subscribe before invoking the venue, so an immediately
    /// failing call still opens and drops one receiver. A call registration
    /// only happens once the venue accepted the call, which makes this the
    /// counter that shows a failed call never started awaiting outcomes.
    #[must_use]
    pub fn registration_count(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, HashMap<OrderId, CallReason>> {
        self.in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for OutcomeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::OutcomeKind;

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let feed = OutcomeFeed::default();
        let delivered = feed.publish(OutcomeEvent::new(OrderId::new("a"), OutcomeKind::CloseOk));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn subscribers_receive_in_publish_order() {
        let feed = OutcomeFeed::default();
        let mut rx = feed.subscribe();

        feed.publish(OutcomeEvent::new(OrderId::new("a"), OutcomeKind::SubmitOk));
        feed.publish(OutcomeEvent::new(OrderId::new("a"), OutcomeKind::FullFillOk));

        assert_eq!(rx.recv().await.unwrap().kind, OutcomeKind::SubmitOk);
        assert_eq!(rx.recv().await.unwrap().kind, OutcomeKind::FullFillOk);
        assert_eq!(feed.subscriber_count(), 1);
    }

    #[test]
    fn register_and_unregister_track_in_flight_calls() {
        let feed = OutcomeFeed::default();
        let request = CallRequest::new(OrderId::new("a"), CallReason::Close);

        feed.register(request.clone());
        assert_eq!(feed.in_flight(&OrderId::new("a")), Some(CallReason::Close));
        assert_eq!(feed.registration_count(), 1);

        feed.unregister(&request);
        assert_eq!(feed.in_flight(&OrderId::new("a")), None);
        assert_eq!(feed.registration_count(), 1);
    }

    #[test]
    fn unregister_keeps_newer_call_for_same_order() {
        let feed = OutcomeFeed::default();
        let order = OrderId::new("a");

        feed.register(CallRequest::new(order.clone(), CallReason::ChangeStopLoss));
        feed.register(CallRequest::new(order.clone(), CallReason::Close));
        feed.unregister(&CallRequest::new(order.clone(), CallReason::ChangeStopLoss));

        assert_eq!(feed.in_flight(&order), Some(CallReason::Close));
    }
}
