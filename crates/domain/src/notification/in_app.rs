use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{NotificationId, Page, Pagination};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{ChannelSender, Notification, NotificationError, validate_message};

/// A notification persisted for display inside the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub id: NotificationId,
    pub email: String,
    pub title: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait InAppStore: Send + Sync {
    async fn insert(&self, notification: InAppNotification) -> Result<(), String>;

    /// Newest first.
    async fn list_for(&self, email: &str, pagination: Pagination) -> Page<InAppNotification>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryInAppStore {
    items: Arc<RwLock<Vec<InAppNotification>>>,
}

impl InMemoryInAppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.items.read().await.len()
    }
}

#[async_trait]
impl InAppStore for InMemoryInAppStore {
    async fn insert(&self, notification: InAppNotification) -> Result<(), String> {
        self.items.write().await.push(notification);
        Ok(())
    }

    async fn list_for(&self, email: &str, pagination: Pagination) -> Page<InAppNotification> {
        let mut matching: Vec<_> = self
            .items
            .read()
            .await
            .iter()
            .filter(|n| n.email == email)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pagination.apply(matching)
    }
}

pub struct InAppChannel {
    store: Arc<dyn InAppStore>,
}

impl InAppChannel {
    pub const NAME: &'static str = "in_app";

    pub fn new(store: Arc<dyn InAppStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChannelSender for InAppChannel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        validate_message(Self::NAME, notification)?;
        self.store
            .insert(InAppNotification {
                id: NotificationId::new(),
                email: notification.email.trim().to_ascii_lowercase(),
                title: notification.title.clone(),
                content: notification.content.clone(),
                is_read: false,
                created_at: Utc::now(),
            })
            .await
            .map_err(|reason| NotificationError::Delivery {
                channel: Self::NAME,
                reason,
            })
    }
}
