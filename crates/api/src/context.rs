//! Request context extraction.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{CORRELATION_ID_HEADER, RequestContext};

/// Longest correlation id accepted from a client.
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Per-request [`RequestContext`], keyed by the caller's `x-correlation-id`
/// or a fresh one.
#[derive(Debug, Clone)]
pub struct Ctx(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for Ctx {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_CORRELATION_ID_LEN);

        Ok(Ctx(match supplied {
            Some(id) => RequestContext::new(id),
            None => RequestContext::generate(),
        }))
    }
}
