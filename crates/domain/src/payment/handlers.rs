use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use event_bus::{BusMessage, EventHandler, HandlerError, OrderPlaced, events};

use super::{EntityType, InitiateTransaction, PaymentGateway, TransactionStore};

/// Opens an order payment with the default provider when an order is
/// placed. Redeliveries reuse the pending transaction.
pub struct OrderPlacedHandler<S: TransactionStore> {
    gateway: Arc<PaymentGateway<S>>,
}

impl<S: TransactionStore> OrderPlacedHandler<S> {
    pub fn new(gateway: Arc<PaymentGateway<S>>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<S: TransactionStore + 'static> EventHandler for OrderPlacedHandler<S> {
    fn name(&self) -> &'static str {
        "payment.order_placed"
    }

    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError> {
        if !message.is(events::ORDER_PLACED) {
            return Ok(());
        }
        let payload: OrderPlaced = message.decode()?;
        let Some(email) = payload.customer_email else {
            tracing::warn!(order_id = %payload.order_id, "order has no customer email; payment not opened");
            return Ok(());
        };

        let tx = self
            .gateway
            .initiate_transaction(
                &message.context(),
                None,
                InitiateTransaction {
                    amount: payload.amount,
                    entity_id: payload.order_id.clone(),
                    entity_type: EntityType::Order,
                    email,
                    metadata: HashMap::from([
                        ("vendorId".to_string(), payload.vendor_id.to_string()),
                        ("userId".to_string(), payload.user_id.to_string()),
                    ]),
                },
            )
            .await
            .map_err(|e| HandlerError::failed(self.name(), e))?;
        tracing::debug!(order_id = %payload.order_id, reference = %tx.reference, "order payment opened");
        Ok(())
    }
}
