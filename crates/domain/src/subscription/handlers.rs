use std::sync::Arc;

use async_trait::async_trait;
use common::SubscriptionId;
use event_bus::{
    BusMessage, EventBus, EventBusExt, EventHandler, HandlerError, OrderPlaced, PaymentCompleted,
    Topic, VendorSubscriptionPaid, events,
};

use super::{SubscriptionService, SubscriptionStore};
use crate::payment::EntityType;

/// Interaction kind recorded for a placed order.
pub const ORDERED_ITEM: &str = "user.ordered_item";

/// Marks a subscription paid when its payment completes, then publishes
/// `subscription.vendor_subscription_paid`.
///
/// The completion event is published on every successful handling, so a
/// redelivery repairs a publish that failed after the write.
pub struct PaymentCompletedHandler<S: SubscriptionStore> {
    subscriptions: Arc<SubscriptionService<S>>,
    bus: Arc<dyn EventBus>,
}

impl<S: SubscriptionStore> PaymentCompletedHandler<S> {
    pub fn new(subscriptions: Arc<SubscriptionService<S>>, bus: Arc<dyn EventBus>) -> Self {
        Self { subscriptions, bus }
    }
}

#[async_trait]
impl<S: SubscriptionStore + 'static> EventHandler for PaymentCompletedHandler<S> {
    fn name(&self) -> &'static str {
        "subscription.payment_completed"
    }

    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError> {
        if !message.is(events::VENDOR_SUBSCRIPTION_PAID_FOR) {
            return Ok(());
        }
        let payload: PaymentCompleted = message.decode()?;
        if payload.entity_type != EntityType::VendorSubscription.as_str() {
            tracing::debug!(entity_type = %payload.entity_type, "not a subscription payment");
            return Ok(());
        }
        let subscription_id = SubscriptionId::parse(&payload.entity_id)
            .map_err(|e| HandlerError::failed(self.name(), e))?;

        let ctx = message.context();
        let subscription = self
            .subscriptions
            .mark_vendor_subscription_as_paid(&ctx, subscription_id, &payload.reference)
            .await
            .map_err(|e| HandlerError::failed(self.name(), e))?;

        self.bus
            .publish_event(
                &ctx,
                Topic::Subscription,
                events::VENDOR_SUBSCRIPTION_PAID,
                &VendorSubscriptionPaid {
                    vendor_id: subscription.vendor_id,
                    subscription_id: subscription.id,
                    amount: subscription.amount,
                    transaction_reference: subscription.paid_transaction,
                },
            )
            .await
            .map_err(|e| HandlerError::failed(self.name(), e))
    }
}

/// Counts a placed order against the vendor's interaction quota.
/// Redeliveries are absorbed by the order id.
pub struct OrderPlacedHandler<S: SubscriptionStore> {
    subscriptions: Arc<SubscriptionService<S>>,
}

impl<S: SubscriptionStore> OrderPlacedHandler<S> {
    pub fn new(subscriptions: Arc<SubscriptionService<S>>) -> Self {
        Self { subscriptions }
    }
}

#[async_trait]
impl<S: SubscriptionStore + 'static> EventHandler for OrderPlacedHandler<S> {
    fn name(&self) -> &'static str {
        "subscription.order_placed"
    }

    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError> {
        if !message.is(events::ORDER_PLACED) {
            return Ok(());
        }
        let payload: OrderPlaced = message.decode()?;
        let outcome = self
            .subscriptions
            .record_interaction(
                &message.context(),
                payload.vendor_id,
                payload.user_id,
                ORDERED_ITEM,
                &payload.order_id,
            )
            .await
            .map_err(|e| HandlerError::failed(self.name(), e))?;
        tracing::debug!(order_id = %payload.order_id, ?outcome, "order counted");
        Ok(())
    }
}
