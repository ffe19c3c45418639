//! Pagination types for list operations.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Requested sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Page request (1-based page number)
///
/// `sort_by` and `sort_order` are carried for callers that forward them, but
/// the Redis repositories only honour insertion order, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

fn default_page() -> u64 {
    DEFAULT_PAGE_NUMBER
}

fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page,
            limit,
            sort_by: None,
            sort_order: None,
        }
    }

    /// Page number, with 0 treated as the first page
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    /// Page size capped at the maximum
    pub fn limit(&self) -> u64 {
        self.limit.min(MAX_PAGE_SIZE)
    }

    /// 0-based index of the first item of the page
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Build a page, deriving the navigation flags from `request` and `total`
    pub fn new(items: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let page = request.page();
        let limit = request.limit();
        Self {
            items,
            total,
            page,
            limit,
            has_next: request.offset().saturating_add(limit) < total,
            has_prev: page > 1,
        }
    }

    /// Number of pages needed for `total` items
    pub fn total_pages(&self) -> u64 {
        if self.limit > 0 {
            self.total.div_ceil(self.limit)
        } else {
            0
        }
    }

    /// Transform the items, keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}
