//! Page arithmetic for listing operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a page request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("Per page error: per_page must be at least 1")]
    PerPage,

    #[error("Page index error: page {page_index} is outside 1..={page_count}")]
    PageIndex { page_index: u64, page_count: u64 },
}

/// A one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_index: u64,
    pub per_page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_index: 1,
            per_page: 10,
        }
    }
}

/// The resolved slice of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
    pub page_count: u64,
}

impl PageRequest {
    pub fn new(page_index: u64, per_page: u64) -> Self {
        Self {
            page_index,
            per_page,
        }
    }

    /// Resolve this request against `total` records.
    ///
    /// An empty listing accepts page 1 and yields an empty window.
    pub fn window(&self, total: u64) -> Result<PageWindow, PageError> {
        if self.per_page < 1 {
            return Err(PageError::PerPage);
        }
        let page_count = total.div_ceil(self.per_page);
        let last = page_count.max(1);
        if self.page_index < 1 || self.page_index > last {
            return Err(PageError::PageIndex {
                page_index: self.page_index,
                page_count,
            });
        }
        Ok(PageWindow {
            skip: (self.page_index - 1) * self.per_page,
            limit: self.per_page,
            page_count,
        })
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub total: u64,
    pub page_count: u64,
    pub page_index: u64,
    pub per_page: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Assemble a page from a resolved request window.
    pub fn new(request: PageRequest, window: PageWindow, total: u64, items: Vec<T>) -> Self {
        Self {
            total,
            page_count: window.page_count,
            page_index: request.page_index,
            per_page: request.per_page,
            items,
        }
    }
}
