//! Pagination state.

use serde::{Deserialize, Serialize};

/// Default rows per page at table mount.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Current page and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    /// Zero-based page index.
    pub page_index: usize,
    /// Rows per page; always positive.
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationState {
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size: page_size.max(1),
        }
    }

    /// Offset of the first row on the current page.
    pub fn offset(&self) -> usize {
        self.page_index * self.page_size
    }

    /// Total pages for a given row count (at least one).
    pub fn total_pages(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.page_size).max(1)
    }
}
