//! Paginated listings.

use serde::Serialize;

use tienda_core::pagination::{PageItem, pagination_numbers, total_pages};

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl<T> Page<T> {
    /// Wrap `items` as page `current_page` of a listing with `total_count`
    /// entries split `per_page` at a time.
    #[must_use]
    pub fn new(items: Vec<T>, current_page: u32, per_page: u32, total_count: u64) -> Self {
        Self {
            items,
            current_page,
            total_pages: total_pages(total_count, per_page),
            total_count,
        }
    }

    /// Pager entries for this page.
    #[must_use]
    pub fn numbers(&self) -> Vec<PageItem> {
        pagination_numbers(self.current_page, self.total_pages)
    }
}
