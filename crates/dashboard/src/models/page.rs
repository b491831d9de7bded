//! Pagination for list queries.

use serde::Deserialize;

/// Rows returned when no limit is given.
pub const DEFAULT_LIMIT: u32 = 50;
/// Largest accepted limit.
pub const MAX_LIMIT: u32 = 1000;

/// A window into an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// Clamp user-supplied values into range.
    #[must_use]
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// The first `limit` rows.
    #[must_use]
    pub fn first(limit: u32) -> Self {
        Self::new(Some(limit), None)
    }

    /// Everything the store will return in one call.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            limit: MAX_LIMIT,
            offset: 0,
        }
    }

    /// Apply to an already sorted vector.
    #[must_use]
    pub fn slice<T>(self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// `limit`/`offset` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Self::new(query.limit, query.offset)
    }
}
