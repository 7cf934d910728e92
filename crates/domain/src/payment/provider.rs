use std::collections::HashMap;

use async_trait::async_trait;
use common::Money;

use super::{PaymentError, TransactionStatus};

/// Request headers of an inbound webhook, with lowercased names.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    headers: HashMap<String, String>,
}

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for WebhookHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}

/// What the gateway asks a provider to collect.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub reference: String,
    pub amount: Money,
    pub email: String,
    pub callback_url: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// A provider's answer to a charge request.
#[derive(Debug, Clone)]
pub struct Initiated {
    /// Hosted page where the payer completes the payment.
    pub payment_url: String,
    /// Provider-specific extras, e.g. Paystack's access code.
    pub metadata: HashMap<String, String>,
}

/// A verified status report for one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeUpdate {
    pub reference: String,
    pub status: TransactionStatus,
    /// Amount the provider says it collected, in minor units.
    pub amount: Option<Money>,
}

/// A verified webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Charge(ChargeUpdate),
    /// Authentic, but not an event this service acts on.
    Ignored { event: String },
}

/// A payment backend.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Registry key, lowercase.
    fn name(&self) -> &'static str;

    async fn initiate(&self, charge: &ChargeRequest) -> Result<Initiated, PaymentError>;

    /// Authenticates and decodes a webhook. Must reject forged requests.
    fn parse_webhook(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> Result<WebhookEvent, PaymentError>;

    /// Header only this provider sends on its webhooks, if any.
    fn signature_header(&self) -> Option<&'static str> {
        None
    }

    /// Body heuristic used only when a webhook does not name its provider.
    fn recognizes(&self, body: &serde_json::Value) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_are_case_insensitive() {
        let headers: WebhookHeaders = [("X-Paystack-Signature", "abc")].into_iter().collect();
        assert_eq!(headers.get("x-paystack-signature"), Some("abc"));
        assert_eq!(headers.get("X-PAYSTACK-SIGNATURE"), Some("abc"));
        assert_eq!(headers.get("verif-hash"), None);
    }
}
