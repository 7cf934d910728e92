//! Flutterwave adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use common::Money;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::{
    ChargeRequest, ChargeUpdate, Initiated, PaymentError, PaymentProvider, TransactionStatus,
    WebhookEvent, WebhookHeaders,
};

pub const HASH_HEADER: &str = "verif-hash";
pub const DEFAULT_BASE_URL: &str = "https://api.flutterwave.com/v3";

#[derive(Debug, Clone)]
pub struct FlutterwaveConfig {
    pub secret_key: String,
    /// Shared secret Flutterwave echoes in the `verif-hash` header.
    pub secret_hash: String,
    pub base_url: String,
    pub currency: String,
}

impl FlutterwaveConfig {
    pub fn new(secret_key: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            secret_hash: secret_hash.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            currency: "NGN".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub struct FlutterwaveProvider {
    client: reqwest::Client,
    config: FlutterwaveConfig,
}

impl FlutterwaveProvider {
    pub const NAME: &'static str = "flutterwave";

    pub fn new(config: FlutterwaveConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: FlutterwaveConfig) -> Self {
        Self { client, config }
    }

    fn verify_hash(&self, headers: &WebhookHeaders) -> Result<(), PaymentError> {
        let expected = self.config.secret_hash.as_bytes();
        match headers.get(HASH_HEADER) {
            Some(hash) if bool::from(hash.as_bytes().ct_eq(expected)) => Ok(()),
            _ => Err(PaymentError::InvalidSignature {
                provider: Self::NAME,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PaymentLink {
    link: String,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    event: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    tx_ref: String,
    #[serde(default)]
    flw_ref: Option<String>,
    /// Major units, possibly fractional.
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    status: Option<String>,
}

#[async_trait]
impl PaymentProvider for FlutterwaveProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip(self, charge), fields(reference = %charge.reference))]
    async fn initiate(&self, charge: &ChargeRequest) -> Result<Initiated, PaymentError> {
        let url = format!("{}/payments", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "tx_ref": charge.reference,
            "amount": charge.amount.to_string(),
            "currency": self.config.currency,
            "redirect_url": charge.callback_url,
            "customer": { "email": charge.email },
            "meta": charge.metadata,
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
        let envelope: Envelope<PaymentLink> = response
            .json()
            .await
            .map_err(|e| PaymentError::provider(Self::NAME, e))?;

        match envelope.data {
            Some(data) if status.is_success() && envelope.status == "success" => Ok(Initiated {
                payment_url: data.link,
                metadata: HashMap::new(),
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
        self.verify_hash(headers)?;
        let parsed: WebhookBody =
            serde_json::from_slice(body).map_err(|e| PaymentError::MalformedWebhook {
                provider: Self::NAME,
                reason: e.to_string(),
            })?;
        if parsed.event != "charge.completed" {
            return Ok(WebhookEvent::Ignored {
                event: parsed.event,
            });
        }

        let status = match parsed.data.status.as_deref() {
            Some("successful") => TransactionStatus::Success,
            Some("failed") => TransactionStatus::Failed,
            _ => {
                return Ok(WebhookEvent::Ignored {
                    event: parsed.event,
                });
            }
        };
        tracing::debug!(flw_ref = ?parsed.data.flw_ref, "flutterwave charge update");
        Ok(WebhookEvent::Charge(ChargeUpdate {
            reference: parsed.data.tx_ref,
            status,
            amount: parsed
                .data
                .amount
                .map(|major| Money::from_cents((major * 100.0).round() as i64)),
        }))
    }

    fn signature_header(&self) -> Option<&'static str> {
        Some(HASH_HEADER)
    }

    fn recognizes(&self, body: &serde_json::Value) -> bool {
        body.get("event").and_then(|e| e.as_str()) == Some("charge.completed")
            || body.pointer("/data/flw_ref").is_some()
    }
}
