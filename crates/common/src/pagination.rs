use serde::{Deserialize, Serialize};

/// Limit/offset window shared by every list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    /// Default page size for most list endpoints.
    pub const DEFAULT_LIMIT: usize = 10;

    /// Default page size for notification style feeds.
    pub const FEED_LIMIT: usize = 20;

    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Builds a window from optional query values.
    ///
    /// A missing or non-positive limit falls back to `default_limit`;
    /// a missing offset is zero.
    pub fn from_query(limit: Option<i64>, offset: Option<i64>, default_limit: usize) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l as usize,
            _ => default_limit,
        };
        let offset = offset.filter(|o| *o > 0).map(|o| o as usize).unwrap_or(0);
        Self { limit, offset }
    }

    /// Applies the window to an already ordered list.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        Page { items, total }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}
