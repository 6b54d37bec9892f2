//! Page requests and the pagination block of the response envelope.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;
pub const DEFAULT_MESSAGE_LIMIT: u64 = 50;
pub const MAX_LIMIT: u64 = 100;

/// A 1-based page request with a clamped limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Build a request, clamping `page >= 1` and `1 <= limit <= MAX_LIMIT`.
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Build from optional query values with the given default limit.
    pub fn from_query(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> Self {
        Self::new(page.unwrap_or(DEFAULT_PAGE), limit.unwrap_or(default_limit))
    }

    /// Number of items to skip.
    pub fn skip(&self) -> usize {
        ((self.page - 1).saturating_mul(self.limit)) as usize
    }

    pub fn take(&self) -> usize {
        self.limit as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

/// Pagination metadata returned alongside list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.limit);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

/// Apply a page request to an already ordered iterator.
pub fn paginate<T>(items: impl IntoIterator<Item = T>, request: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(request.skip())
        .take(request.take())
        .collect()
}
