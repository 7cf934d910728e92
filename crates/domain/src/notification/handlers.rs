use std::sync::Arc;

use async_trait::async_trait;
use event_bus::{
    BusMessage, EventHandler, HandlerError, ProcessedKeys, VendorActivated,
    VendorSubscriptionPaid, events,
};

use super::{Notification, NotificationDispatcher, RecipientResolver};

// Sending is not idempotent, so both notifiers keep their claim on a key
// even when a channel fails: a partial fan-out is never repeated.

/// Welcomes a vendor whose account was activated. Deduped by vendor id.
pub struct VendorActivatedNotifier {
    dispatcher: Arc<NotificationDispatcher>,
    sent: ProcessedKeys,
}

impl VendorActivatedNotifier {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            dispatcher,
            sent: ProcessedKeys::new(),
        }
    }
}

#[async_trait]
impl EventHandler for VendorActivatedNotifier {
    fn name(&self) -> &'static str {
        "notification.vendor_activated"
    }

    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError> {
        if !message.is(events::VENDOR_ACTIVATED) {
            return Ok(());
        }
        let payload: VendorActivated = message.decode()?;
        if !self.sent.claim(&payload.vendor_id.to_string()).await {
            tracing::debug!(vendor_id = %payload.vendor_id, "welcome already sent");
            return Ok(());
        }

        self.dispatcher
            .send(&Notification {
                email: payload.email,
                phone: None,
                title: "Your vendor account is active".to_string(),
                content: format!(
                    "Hi {}, your subscription payment was received and your store is now live.",
                    payload.name
                ),
            })
            .await
            .map_err(|e| HandlerError::failed(self.name(), e))
    }
}

/// Confirms a subscription payment to the vendor. Deduped by subscription id.
pub struct SubscriptionPaidNotifier {
    dispatcher: Arc<NotificationDispatcher>,
    recipients: Arc<dyn RecipientResolver>,
    sent: ProcessedKeys,
}

impl SubscriptionPaidNotifier {
    pub fn new(
        dispatcher: Arc<NotificationDispatcher>,
        recipients: Arc<dyn RecipientResolver>,
    ) -> Self {
        Self {
            dispatcher,
            recipients,
            sent: ProcessedKeys::new(),
        }
    }
}

#[async_trait]
impl EventHandler for SubscriptionPaidNotifier {
    fn name(&self) -> &'static str {
        "notification.subscription_paid"
    }

    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError> {
        if !message.is(events::VENDOR_SUBSCRIPTION_PAID) {
            return Ok(());
        }
        let payload: VendorSubscriptionPaid = message.decode()?;
        let Some(recipient) = self.recipients.resolve(payload.vendor_id).await else {
            return Err(HandlerError::failed(
                self.name(),
                format!("no recipient for vendor {}", payload.vendor_id),
            ));
        };

        let key = payload.subscription_id.to_string();
        if !self.sent.claim(&key).await {
            tracing::debug!(subscription_id = %key, "receipt already sent");
            return Ok(());
        }

        self.dispatcher
            .send(&Notification {
                email: recipient.email,
                phone: recipient.phone,
                title: "Subscription payment received".to_string(),
                content: format!(
                    "Hi {}, we received your payment of {} for subscription {}.",
                    recipient.name, payload.amount, payload.subscription_id
                ),
            })
            .await
            .map_err(|e| HandlerError::failed(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{EmailChannel, InMemoryMailer, Recipient};
    use common::{Money, SubscriptionId, UserId, VendorId};

    struct OneRecipient(VendorId);

    #[async_trait]
    impl RecipientResolver for OneRecipient {
        async fn resolve(&self, vendor_id: VendorId) -> Option<Recipient> {
            (vendor_id == self.0).then(|| Recipient {
                email: "v@x.com".into(),
                name: "Vendor X".into(),
                phone: None,
            })
        }
    }

    fn email_only(mailer: &InMemoryMailer) -> Arc<NotificationDispatcher> {
        Arc::new(NotificationDispatcher::new(vec![Arc::new(EmailChannel::new(
            Arc::new(mailer.clone()),
        ))]))
    }

    #[tokio::test]
    async fn test_receipt_sent_once_per_subscription() {
        let mailer = InMemoryMailer::new();
        let vendor_id = VendorId::new();
        let notifier =
            SubscriptionPaidNotifier::new(email_only(&mailer), Arc::new(OneRecipient(vendor_id)));
        let msg = BusMessage::new(
            events::VENDOR_SUBSCRIPTION_PAID,
            &VendorSubscriptionPaid {
                vendor_id,
                subscription_id: SubscriptionId::new(),
                amount: Money::from_cents(500000),
                transaction_reference: None,
            },
        )
        .unwrap();

        notifier.handle(&msg).await.unwrap();
        notifier.handle(&msg).await.unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("5000.00"));
    }

    #[tokio::test]
    async fn test_unknown_vendor_is_an_error() {
        let mailer = InMemoryMailer::new();
        let notifier = SubscriptionPaidNotifier::new(
            email_only(&mailer),
            Arc::new(OneRecipient(VendorId::new())),
        );
        let msg = BusMessage::new(
            events::VENDOR_SUBSCRIPTION_PAID,
            &VendorSubscriptionPaid {
                vendor_id: VendorId::new(),
                subscription_id: SubscriptionId::new(),
                amount: Money::from_cents(1),
                transaction_reference: None,
            },
        )
        .unwrap();

        assert!(notifier.handle(&msg).await.is_err());
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_welcome_sent_once_per_vendor() {
        let mailer = InMemoryMailer::new();
        let notifier = VendorActivatedNotifier::new(email_only(&mailer));
        let msg = BusMessage::new(
            events::VENDOR_ACTIVATED,
            &VendorActivated {
                vendor_id: VendorId::new(),
                user_id: UserId::new(),
                email: "v@x.com".into(),
                name: "Vendor X".into(),
            },
        )
        .unwrap();

        notifier.handle(&msg).await.unwrap();
        notifier.handle(&msg).await.unwrap();
        assert_eq!(mailer.sent().await.len(), 1);
    }
}
