use async_trait::async_trait;

use super::{Notification, NotificationError};
use crate::validation::{has_min_chars, is_valid_email};

/// A delivery channel. Each channel validates the fields it needs.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Checks the fields every channel shares: a valid email, a title of at
/// least 3 characters and content of at least 5.
pub fn validate_message(
    channel: &'static str,
    notification: &Notification,
) -> Result<(), NotificationError> {
    let invalid = |reason: &str| NotificationError::Validation {
        channel,
        reason: reason.to_string(),
    };
    if notification.email.trim().is_empty() {
        return Err(invalid("email is required"));
    }
    if !is_valid_email(notification.email.trim()) {
        return Err(invalid("email must be a valid address"));
    }
    if !has_min_chars(&notification.title, 3) {
        return Err(invalid("title must be at least 3 characters"));
    }
    if !has_min_chars(&notification.content, 5) {
        return Err(invalid("content must be at least 5 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(email: &str, title: &str, content: &str) -> Notification {
        Notification {
            email: email.into(),
            phone: None,
            title: title.into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_accepts_valid_message() {
        assert!(validate_message("email", &note("v@x.com", "Hey", "Hello")).is_ok());
    }

    #[test]
    fn test_rejects_each_field() {
        for (n, needle) in [
            (note("", "Hey", "Hello"), "required"),
            (note("nope", "Hey", "Hello"), "valid address"),
            (note("v@x.com", "Hi", "Hello"), "title"),
            (note("v@x.com", "Hey", "Hi"), "content"),
        ] {
            let err = validate_message("email", &n).unwrap_err();
            assert!(err.to_string().contains(needle), "{err}");
        }
    }
}
