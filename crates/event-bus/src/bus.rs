//! Bus and handler traits.

use std::sync::Arc;

use async_trait::async_trait;
use common::RequestContext;
use serde::Serialize;

use crate::error::{BusError, HandlerError};
use crate::message::BusMessage;
use crate::topic::Topic;

/// A consumer of bus messages.
///
/// Delivery is at-least-once: implementations must tolerate seeing the same
/// message more than once and must ignore events they do not recognise.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Handles one delivery of a message.
    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError>;
}

/// Topic-based publish/subscribe transport.
///
/// The producer only learns whether the transport accepted the message;
/// handler outcomes are never reported back.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes a message to a topic.
    async fn publish(&self, topic: Topic, message: BusMessage) -> Result<(), BusError>;

    /// Registers the consumer group `group` for `topic`.
    ///
    /// Each (group, topic) pair has exactly one logical consumer; registering
    /// it twice is an error. Registration happens at startup.
    async fn subscribe(
        &self,
        topic: Topic,
        group: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), BusError>;
}

/// Convenience methods for producers.
#[async_trait]
pub trait EventBusExt: EventBus {
    /// Serializes `payload` and publishes it tagged with the request's
    /// correlation id.
    async fn publish_event<T>(
        &self,
        ctx: &RequestContext,
        topic: Topic,
        event: &str,
        payload: &T,
    ) -> Result<(), BusError>
    where
        T: Serialize + Sync,
    {
        let message = BusMessage::new(event, payload)?.with_correlation_id(ctx.correlation_id());
        self.publish(topic, message).await
    }
}

impl<B: EventBus + ?Sized> EventBusExt for B {}
