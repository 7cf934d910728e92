//! Wire message and typed payloads.

use std::collections::HashMap;

use common::{Money, RequestContext, SubscriptionId, UserId, VendorId};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::HandlerError;

/// A message on the bus: `{event, data}`.
///
/// `data` is flat, versionless JSON keyed by business identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub event: String,
    pub data: serde_json::Value,
    #[serde(
        default,
        rename = "correlationId",
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_id: Option<String>,
}

impl BusMessage {
    /// Builds a message from a typed payload.
    pub fn new<T: Serialize>(event: impl Into<String>, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_value(payload)?,
            correlation_id: None,
        })
    }

    /// Tags the message with the originating request's correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Case-insensitive match on the event name.
    pub fn is(&self, event: &str) -> bool {
        self.event.eq_ignore_ascii_case(event)
    }

    /// Request context for work done on behalf of this message, carrying
    /// the producer's correlation id when there is one.
    pub fn context(&self) -> RequestContext {
        match &self.correlation_id {
            Some(id) => RequestContext::new(id.clone()),
            None => RequestContext::generate(),
        }
    }

    /// Decodes `data` into the payload type expected for this event.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(self.data.clone()).map_err(|source| {
            HandlerError::MalformedPayload {
                event: self.event.clone(),
                source,
            }
        })
    }

    /// Encodes the whole message as JSON bytes for a byte-oriented broker.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decodes a message from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// `subscription.vendor_subscription_created`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSubscriptionCreated {
    pub vendor_id: VendorId,
    pub subscription_id: SubscriptionId,
    pub amount: Money,
}

/// `subscription.vendor_subscription_paid`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSubscriptionPaid {
    pub vendor_id: VendorId,
    pub subscription_id: SubscriptionId,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
}

/// `payment.vendor_subscription_paid_for` and `payment.order_paid_for`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompleted {
    pub entity_id: String,
    pub entity_type: String,
    pub amount: Money,
    /// Provider-side reference of the transaction that paid.
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// `order.order_placed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub user_id: UserId,
    pub vendor_id: VendorId,
    pub order_id: String,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

/// `vendor.vendor_activated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorActivated {
    pub vendor_id: VendorId,
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

/// `user.created`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreated {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::events;

    #[test]
    fn test_payload_uses_camel_case_keys() {
        let payload = VendorSubscriptionCreated {
            vendor_id: VendorId::new(),
            subscription_id: SubscriptionId::new(),
            amount: Money::from_cents(500000),
        };
        let msg = BusMessage::new(events::VENDOR_SUBSCRIPTION_CREATED, &payload).unwrap();

        assert!(msg.data.get("vendorId").is_some());
        assert!(msg.data.get("subscriptionId").is_some());
        assert_eq!(msg.data["amount"], 500000);
    }

    #[test]
    fn test_event_match_ignores_case() {
        let msg = BusMessage {
            event: "PAYMENT.Vendor_Subscription_Paid_For".to_string(),
            data: serde_json::json!({}),
            correlation_id: None,
        };
        assert!(msg.is(events::VENDOR_SUBSCRIPTION_PAID_FOR));
        assert!(!msg.is(events::ORDER_PAID_FOR));
    }

    #[test]
    fn test_decode_reports_malformed_payload() {
        let msg = BusMessage {
            event: events::ORDER_PLACED.to_string(),
            data: serde_json::json!({"orderId": 7}),
            correlation_id: None,
        };
        let err = msg.decode::<OrderPlaced>().unwrap_err();
        assert!(matches!(err, HandlerError::MalformedPayload { .. }));
    }

    #[test]
    fn test_wire_format_omits_missing_correlation_id() {
        let msg = BusMessage::new("auth.ping", &serde_json::json!({"a": 1})).unwrap();
        let wire: serde_json::Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(wire, serde_json::json!({"event": "auth.ping", "data": {"a": 1}}));

        let tagged = msg.with_correlation_id("req-9");
        let back = BusMessage::from_bytes(&tagged.to_bytes().unwrap()).unwrap();
        assert_eq!(back.correlation_id.as_deref(), Some("req-9"));
        assert_eq!(back.context().correlation_id(), "req-9");
    }

    #[test]
    fn test_payment_completed_metadata_defaults_empty() {
        let payload: PaymentCompleted = serde_json::from_value(serde_json::json!({
            "entityId": "abc",
            "entityType": "vendor-subscription",
            "amount": 100
        }))
        .unwrap();
        assert!(payload.metadata.is_empty());
    }
}
