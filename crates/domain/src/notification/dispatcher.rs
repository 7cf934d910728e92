use std::sync::Arc;

use futures_util::future::join_all;

use super::{ChannelFailure, ChannelSender, Notification, NotificationError};

/// Sends one notification on every registered channel concurrently.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn ChannelSender>>,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Arc<dyn ChannelSender>>) -> Self {
        Self { channels }
    }

    pub fn with_channel(mut self, channel: Arc<dyn ChannelSender>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel(&self, name: &str) -> Option<Arc<dyn ChannelSender>> {
        self.channels.iter().find(|c| c.name() == name).cloned()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Runs every channel to completion, one result slot per channel.
    ///
    /// Succeeds only if all channels succeed; otherwise the error lists each
    /// failed channel with its cause. Nothing is retried.
    #[tracing::instrument(skip_all, fields(channels = self.channels.len()))]
    pub async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let outcomes = join_all(
            self.channels
                .iter()
                .map(|channel| async move { (channel.name(), channel.send(notification).await) }),
        )
        .await;

        let failures: Vec<ChannelFailure> = outcomes
            .into_iter()
            .filter_map(|(channel, outcome)| {
                outcome.err().map(|e| {
                    metrics::counter!("notification_channel_failures_total", "channel" => channel)
                        .increment(1);
                    tracing::warn!(channel, error = %e, "channel failed");
                    ChannelFailure {
                        channel: channel.to_string(),
                        reason: e.to_string(),
                    }
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::Dispatch { failures })
        }
    }
}
