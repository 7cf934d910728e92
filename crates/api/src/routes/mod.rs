//! HTTP route handlers.

pub mod auth;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod subscriptions;

use crate::error::ApiError;

/// Parses a path segment into a typed id, answering 400 when it is malformed.
pub(crate) fn parse_id<T, E>(
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ApiError>
where
    E: std::fmt::Display,
{
    parse(raw).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
