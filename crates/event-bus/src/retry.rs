//! Consumer-side retry policy.

use std::time::Duration;

use async_trait::async_trait;

use crate::bus::EventHandler;
use crate::error::HandlerError;
use crate::message::BusMessage;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: initial_backoff * 16,
        }
    }

    /// Backoff before attempt `attempt` (1-based; attempt 1 never waits).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

/// Wraps a handler with a [`RetryPolicy`].
///
/// Malformed payloads are permanent failures and are not retried.
pub struct Retrying<H> {
    inner: H,
    policy: RetryPolicy,
}

impl<H: EventHandler> Retrying<H> {
    pub fn new(inner: H, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<H: EventHandler> EventHandler for Retrying<H> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError> {
        let mut attempt = 1;
        loop {
            match self.inner.handle(message).await {
                Ok(()) => return Ok(()),
                Err(e @ HandlerError::MalformedPayload { .. }) => return Err(e),
                Err(e) if attempt >= self.policy.max_attempts => {
                    tracing::warn!(
                        handler = self.inner.name(),
                        attempts = attempt,
                        error = %e,
                        "giving up after retries"
                    );
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    let wait = self.policy.backoff_for(attempt);
                    tracing::debug!(
                        handler = self.inner.name(),
                        attempt,
                        ?wait,
                        error = %e,
                        "retrying event handler"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
