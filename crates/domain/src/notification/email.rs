use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ChannelSender, Notification, NotificationError, validate_message};

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Hands email to a transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<(), String>;
}

/// Writes email to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<(), String> {
        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Records email in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    outbox: Arc<Mutex<Vec<OutgoingEmail>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("smtp connection refused".to_string());
        }
        self.outbox.lock().await.push(email.clone());
        Ok(())
    }
}

pub struct EmailChannel {
    mailer: Arc<dyn Mailer>,
}

impl EmailChannel {
    pub const NAME: &'static str = "email";

    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl ChannelSender for EmailChannel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        validate_message(Self::NAME, notification)?;
        self.mailer
            .deliver(&OutgoingEmail {
                to: notification.email.trim().to_string(),
                subject: notification.title.clone(),
                body: notification.content.clone(),
            })
            .await
            .map_err(|reason| NotificationError::Delivery {
                channel: Self::NAME,
                reason,
            })
    }
}
