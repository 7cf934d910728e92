//! Event bus error types.

use thiserror::Error;

use crate::topic::Topic;

/// Errors raised by the bus itself (transport level).
#[derive(Debug, Error)]
pub enum BusError {
    /// The message could not be handed to the transport.
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed { topic: Topic, reason: String },

    /// A consumer group is already registered for the topic.
    #[error("Consumer group '{group}' is already subscribed to topic '{topic}'")]
    DuplicateConsumerGroup { topic: Topic, group: String },

    /// Payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by event handlers.
///
/// These never travel back to the producer; the bus logs them.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload did not match the expected shape for the event.
    #[error("Malformed payload for '{event}': {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    /// The handler's own operation failed.
    #[error("Handler '{handler}' failed: {reason}")]
    Failed { handler: String, reason: String },
}

impl HandlerError {
    /// Wraps any displayable error as a handler failure.
    pub fn failed(handler: impl Into<String>, err: impl std::fmt::Display) -> Self {
        HandlerError::Failed {
            handler: handler.into(),
            reason: err.to_string(),
        }
    }
}
