//! Paystack adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use common::Money;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;

use super::{
    ChargeRequest, ChargeUpdate, Initiated, PaymentError, PaymentProvider, TransactionStatus,
    WebhookEvent, WebhookHeaders,
};

type HmacSha512 = Hmac<Sha512>;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";
pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Hex HMAC-SHA512 of `body` keyed by the secret key, as Paystack signs
/// its webhooks.
pub fn sign(secret_key: &str, body: &[u8]) -> Result<String, PaymentError> {
    let mut mac = HmacSha512::new_from_slice(secret_key.as_bytes())
        .map_err(|e| PaymentError::Registry(format!("paystack secret key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub base_url: String,
}

impl PaystackConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub struct PaystackProvider {
    client: reqwest::Client,
    config: PaystackConfig,
}

impl PaystackProvider {
    pub const NAME: &'static str = "paystack";

    pub fn new(config: PaystackConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: PaystackConfig) -> Self {
        Self { client, config }
    }

    fn verify_signature(&self, headers: &WebhookHeaders, body: &[u8]) -> Result<(), PaymentError> {
        let invalid = || PaymentError::InvalidSignature {
            provider: Self::NAME,
        };
        let signature = headers.get(SIGNATURE_HEADER).ok_or_else(invalid)?;
        let expected = hex::decode(signature.trim()).map_err(|_| invalid())?;

        let mut mac = HmacSha512::new_from_slice(self.config.secret_key.as_bytes())
            .map_err(|_| invalid())?;
        mac.update(body);
        mac.verify_slice(&expected).map_err(|_| invalid())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    event: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    reference: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    status: Option<String>,
}

#[async_trait]
impl PaymentProvider for PaystackProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip(self, charge), fields(reference = %charge.reference))]
    async fn initiate(&self, charge: &ChargeRequest) -> Result<Initiated, PaymentError> {
        let url = format!(
            "{}/transaction/initialize",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "email": charge.email,
            "amount": charge.amount.cents(),
            "reference": charge.reference,
            "callback_url": charge.callback_url,
            "metadata": charge.metadata,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::provider(Self::NAME, e))?;
        let status = response.status();
        let envelope: Envelope<InitializeData> = response
            .json()
            .await
            .map_err(|e| PaymentError::provider(Self::NAME, e))?;

        match envelope.data {
            Some(data) if status.is_success() && envelope.status => Ok(Initiated {
                payment_url: data.authorization_url,
                metadata: HashMap::from([("accessCode".to_string(), data.access_code)]),
            }),
            _ => Err(PaymentError::provider(
                Self::NAME,
                format!("{status}: {}", envelope.message),
            )),
        }
    }

    fn parse_webhook(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> Result<WebhookEvent, PaymentError> {
        self.verify_signature(headers, body)?;
        let parsed: WebhookBody =
            serde_json::from_slice(body).map_err(|e| PaymentError::MalformedWebhook {
                provider: Self::NAME,
                reason: e.to_string(),
            })?;

        let status = match (parsed.event.as_str(), parsed.data.status.as_deref()) {
            ("charge.success", _) => TransactionStatus::Success,
            (event, Some("failed")) if event.starts_with("charge.") => TransactionStatus::Failed,
            (event, Some("abandoned")) if event.starts_with("charge.") => {
                TransactionStatus::Abandoned
            }
            _ => {
                return Ok(WebhookEvent::Ignored {
                    event: parsed.event,
                });
            }
        };
        Ok(WebhookEvent::Charge(ChargeUpdate {
            reference: parsed.data.reference,
            status,
            amount: parsed.data.amount.map(Money::from_cents),
        }))
    }

    fn signature_header(&self) -> Option<&'static str> {
        Some(SIGNATURE_HEADER)
    }

    fn recognizes(&self, body: &serde_json::Value) -> bool {
        body.get("event").and_then(|e| e.as_str()) == Some("charge.success")
    }
}
