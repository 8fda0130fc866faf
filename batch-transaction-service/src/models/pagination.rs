//! Page requests and derived pagination metadata.

use serde::Serialize;

use super::{TransactionHeader, TransactionStatus};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;

/// A normalized, 1-based page request. Both fields are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    per_page: i64,
}

impl PageRequest {
    /// Missing or non-positive values fall back to page 1 / 10 per page.
    pub fn normalize(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE),
            per_page: per_page.filter(|p| *p > 0).unwrap_or(DEFAULT_PER_PAGE),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::normalize(None, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: i64) -> Self {
        let per_page = request.per_page();
        let current_page = request.page();
        let total_pages = total_items / per_page + i64::from(total_items % per_page != 0);

        Self {
            current_page,
            total_pages,
            per_page,
            total_items,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

/// List query: a status filter (empty matches everything) and a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub statuses: Vec<TransactionStatus>,
    pub page: PageRequest,
}

impl ListParams {
    pub fn status_strings(&self) -> Vec<String> {
        self.statuses.iter().map(|s| s.as_str().to_string()).collect()
    }

    pub fn matches(&self, status: TransactionStatus) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&status)
    }
}

/// One page of headers, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    pub data: Vec<TransactionHeader>,
    pub pagination: Pagination,
}
