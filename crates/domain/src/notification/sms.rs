use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ChannelSender, Notification, NotificationError, validate_message};

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn deliver(&self, phone: &str, text: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSmsGateway;

#[async_trait]
impl SmsGateway for LogSmsGateway {
    async fn deliver(&self, phone: &str, _text: &str) -> Result<(), String> {
        tracing::info!(%phone, "sms sent");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySmsGateway {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl InMemorySmsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl SmsGateway for InMemorySmsGateway {
    async fn deliver(&self, phone: &str, text: &str) -> Result<(), String> {
        self.sent
            .lock()
            .await
            .push((phone.to_string(), text.to_string()));
        Ok(())
    }
}

/// Sends `title: content` as a text message. Requires a phone number.
pub struct SmsChannel {
    gateway: Arc<dyn SmsGateway>,
}

impl SmsChannel {
    pub const NAME: &'static str = "sms";

    pub fn new(gateway: Arc<dyn SmsGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ChannelSender for SmsChannel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        validate_message(Self::NAME, notification)?;
        let phone = notification
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| NotificationError::Validation {
                channel: Self::NAME,
                reason: "phone is required".to_string(),
            })?;
        let text = format!("{}: {}", notification.title, notification.content);
        self.gateway
            .deliver(phone, &text)
            .await
            .map_err(|reason| NotificationError::Delivery {
                channel: Self::NAME,
                reason,
            })
    }
}
