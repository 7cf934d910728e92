use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::Instrument;

use crate::bus::{EventBus, EventHandler};
use crate::error::BusError;
use crate::message::BusMessage;
use crate::topic::Topic;

#[derive(Clone)]
struct Subscription {
    group: String,
    handler: Arc<dyn EventHandler>,
}

/// In-process event bus.
///
/// Delivers each published message to every consumer group of the topic
/// before `publish` returns. Handler failures are logged and counted, never
/// retried and never reported to the producer. Can be told to deliver every
/// message twice to exercise handler idempotency.
///
/// The most recent `history_capacity` messages are kept for inspection;
/// older ones are dropped.
#[derive(Clone)]
pub struct InMemoryEventBus {
    subscriptions: Arc<RwLock<HashMap<Topic, Vec<Subscription>>>>,
    published: Arc<Mutex<VecDeque<(Topic, BusMessage)>>>,
    history_capacity: usize,
    duplicate_delivery: Arc<AtomicBool>,
    fail_on_publish: Arc<AtomicBool>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }
}

/// Messages remembered by [`InMemoryEventBus::new`].
pub const DEFAULT_HISTORY: usize = 1024;

impl InMemoryEventBus {
    /// Creates a bus with no consumers that remembers the last
    /// [`DEFAULT_HISTORY`] messages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus that remembers at most `capacity` messages. Zero keeps
    /// no history.
    pub fn with_history(capacity: usize) -> Self {
        Self {
            subscriptions: Arc::default(),
            published: Arc::default(),
            history_capacity: capacity,
            duplicate_delivery: Arc::default(),
            fail_on_publish: Arc::default(),
        }
    }

    /// Delivers every message twice when set.
    pub fn set_duplicate_delivery(&self, enabled: bool) {
        self.duplicate_delivery.store(enabled, Ordering::SeqCst);
    }

    /// Makes the transport reject publishes when set.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Returns the remembered messages, in publish order.
    pub async fn published(&self) -> Vec<(Topic, BusMessage)> {
        self.published.lock().await.iter().cloned().collect()
    }

    /// Returns accepted messages with the given event name.
    pub async fn published_events(&self, event: &str) -> Vec<BusMessage> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(_, m)| m.is(event))
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Returns the consumer groups registered for a topic.
    pub async fn consumer_groups(&self, topic: Topic) -> Vec<String> {
        self.subscriptions
            .read()
            .await
            .get(&topic)
            .map(|subs| subs.iter().map(|s| s.group.clone()).collect())
            .unwrap_or_default()
    }

    async fn deliver(&self, topic: Topic, subscription: &Subscription, message: &BusMessage) {
        let span = tracing::info_span!(
            "bus_delivery",
            %topic,
            group = %subscription.group,
            handler = subscription.handler.name(),
            event = %message.event,
            correlation_id = message.correlation_id.as_deref().unwrap_or(""),
        );

        let result = subscription.handler.handle(message).instrument(span).await;
        match result {
            Ok(()) => {
                metrics::counter!("bus_deliveries_total", "topic" => topic.as_str()).increment(1);
            }
            Err(e) => {
                metrics::counter!("bus_handler_failures_total", "topic" => topic.as_str())
                    .increment(1);
                tracing::error!(
                    %topic,
                    group = %subscription.group,
                    event = %message.event,
                    error = %e,
                    "event handler failed; message will not be redelivered"
                );
            }
        }
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: Topic, message: BusMessage) -> Result<(), BusError> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(BusError::PublishFailed {
                topic,
                reason: "transport unavailable".to_string(),
            });
        }

        if self.history_capacity > 0 {
            let mut history = self.published.lock().await;
            if history.len() == self.history_capacity {
                history.pop_front();
            }
            history.push_back((topic, message.clone()));
        }
        metrics::counter!("bus_messages_published_total", "topic" => topic.as_str()).increment(1);
        tracing::debug!(%topic, event = %message.event, "message published");

        // Snapshot the consumers so handlers may publish without holding the lock.
        let subscriptions = self
            .subscriptions
            .read()
            .await
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        let copies = if self.duplicate_delivery.load(Ordering::SeqCst) {
            2
        } else {
            1
        };

        for subscription in &subscriptions {
            for _ in 0..copies {
                self.deliver(topic, subscription, &message).await;
            }
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        topic: Topic,
        group: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), BusError> {
        let mut subscriptions = self.subscriptions.write().await;
        let entry = subscriptions.entry(topic).or_default();

        if entry.iter().any(|s| s.group == group) {
            return Err(BusError::DuplicateConsumerGroup {
                topic,
                group: group.to_string(),
            });
        }

        tracing::info!(%topic, group, handler = handler.name(), "consumer registered");
        entry.push(Subscription {
            group: group.to_string(),
            handler,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use std::sync::atomic::AtomicUsize;

    struct CountingHandler {
        seen: AtomicUsize,
        fail: bool,
    }

    impl CountingHandler {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: AtomicUsize::new(0),
                fail,
            })
        }

        fn seen(&self) -> usize {
            self.seen.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn handle(&self, _message: &BusMessage) -> Result<(), HandlerError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HandlerError::failed("counting", "boom"));
            }
            Ok(())
        }
    }

    fn message(event: &str) -> BusMessage {
        BusMessage::new(event, &serde_json::json!({"id": 1})).unwrap()
    }

    #[tokio::test]
    async fn test_delivers_to_every_group_of_topic_only() {
        let bus = InMemoryEventBus::new();
        let a = CountingHandler::new(false);
        let b = CountingHandler::new(false);
        let other = CountingHandler::new(false);

        bus.subscribe(Topic::Payment, "subscription-service", a.clone())
            .await
            .unwrap();
        bus.subscribe(Topic::Payment, "audit", b.clone()).await.unwrap();
        bus.subscribe(Topic::Order, "payment-service", other.clone())
            .await
            .unwrap();

        bus.publish(Topic::Payment, message("payment.order_paid_for"))
            .await
            .unwrap();

        assert_eq!(a.seen(), 1);
        assert_eq!(b.seen(), 1);
        assert_eq!(other.seen(), 0);
        assert_eq!(bus.published().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_group_rejected() {
        let bus = InMemoryEventBus::new();
        let h = CountingHandler::new(false);
        bus.subscribe(Topic::Vendor, "notification-service", h.clone())
            .await
            .unwrap();

        let err = bus
            .subscribe(Topic::Vendor, "notification-service", h)
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::DuplicateConsumerGroup { .. }));
    }

    #[tokio::test]
    async fn test_handler_failure_not_reported_to_producer() {
        let bus = InMemoryEventBus::new();
        let failing = CountingHandler::new(true);
        let healthy = CountingHandler::new(false);
        bus.subscribe(Topic::Order, "a", failing.clone()).await.unwrap();
        bus.subscribe(Topic::Order, "b", healthy.clone()).await.unwrap();

        bus.publish(Topic::Order, message("order.order_placed"))
            .await
            .unwrap();

        // Delivered exactly once: no requeue by the bus.
        assert_eq!(failing.seen(), 1);
        assert_eq!(healthy.seen(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_mode() {
        let bus = InMemoryEventBus::new();
        let h = CountingHandler::new(false);
        bus.subscribe(Topic::Subscription, "vendor-service", h.clone())
            .await
            .unwrap();
        bus.set_duplicate_delivery(true);

        bus.publish(Topic::Subscription, message("subscription.vendor_subscription_paid"))
            .await
            .unwrap();

        assert_eq!(h.seen(), 2);
        assert_eq!(bus.published().await.len(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_publish() {
        let bus = InMemoryEventBus::new();
        bus.set_fail_on_publish(true);
        let err = bus
            .publish(Topic::Payment, message("payment.order_paid_for"))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::PublishFailed { .. }));
        assert!(bus.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_keeps_only_the_newest_messages() {
        let bus = InMemoryEventBus::with_history(2);
        for event in ["order.a", "order.b", "order.c"] {
            bus.publish(Topic::Order, message(event)).await.unwrap();
        }

        let events: Vec<_> = bus
            .published()
            .await
            .into_iter()
            .map(|(_, m)| m.event)
            .collect();
        assert_eq!(events, vec!["order.b", "order.c"]);
    }

    #[tokio::test]
    async fn test_zero_history_still_delivers() {
        let bus = InMemoryEventBus::with_history(0);
        let h = CountingHandler::new(false);
        bus.subscribe(Topic::Order, "payment-service", h.clone())
            .await
            .unwrap();

        bus.publish(Topic::Order, message("order.order_placed"))
            .await
            .unwrap();

        assert_eq!(h.seen(), 1);
        assert!(bus.published().await.is_empty());
    }
}
