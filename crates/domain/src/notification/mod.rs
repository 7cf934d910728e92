//! Notification fan-out to email, in-app and SMS channels.

mod channel;
mod dispatcher;
mod email;
mod handlers;
mod in_app;
mod sms;

pub use channel::{ChannelSender, validate_message};
pub use dispatcher::NotificationDispatcher;
pub use email::{EmailChannel, InMemoryMailer, LogMailer, Mailer, OutgoingEmail};
pub use handlers::{SubscriptionPaidNotifier, VendorActivatedNotifier};
pub use in_app::{InAppChannel, InAppNotification, InAppStore, InMemoryInAppStore};
pub use sms::{InMemorySmsGateway, LogSmsGateway, SmsChannel, SmsGateway};

use async_trait::async_trait;
use common::VendorId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// A message to deliver on every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub title: String,
    pub content: String,
}

/// One channel's failure inside a fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFailure {
    pub channel: String,
    pub reason: String,
}

impl std::fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.channel, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("{channel}: {reason}")]
    Validation {
        channel: &'static str,
        reason: String,
    },

    #[error("{channel} delivery failed: {reason}")]
    Delivery {
        channel: &'static str,
        reason: String,
    },

    #[error("notification failed on {}", join_failures(.failures))]
    Dispatch { failures: Vec<ChannelFailure> },
}

fn join_failures(failures: &[ChannelFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl NotificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotificationError::Validation { .. } => ErrorKind::Validation,
            NotificationError::Delivery { .. } | NotificationError::Dispatch { .. } => {
                ErrorKind::Downstream
            }
        }
    }
}

/// Contact details for a vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

/// Looks up where to reach a vendor.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve(&self, vendor_id: VendorId) -> Option<Recipient>;
}
