use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// Header used to carry the correlation id across HTTP boundaries.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// The authenticated caller of a request, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub roles: Vec<String>,
}

/// Request-scoped values passed explicitly through every call boundary.
///
/// Carries the correlation id used in logs, the caller (when
/// authenticated) and the deadline that bounds the whole request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: String,
    caller: Option<Caller>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a context with the given correlation id and no deadline.
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            caller: None,
            deadline: None,
        }
    }

    /// Creates a context with a freshly generated correlation id.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Attaches the authenticated caller.
    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Bounds the request by `budget` measured from now.
    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    /// Bounds the request by an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns true if the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|r| r.is_zero())
    }

    /// Copy for work that outlives the request.
    ///
    /// Keeps the correlation id and caller so the work stays attributable,
    /// but drops the deadline so it is not cut short when the response is
    /// written.
    pub fn detached(&self) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            caller: self.caller.clone(),
            deadline: None,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::generate()
    }
}
