//! Pagination types shared by every list query.

use serde::{Deserialize, Serialize};

/// A page request. Constructed through [`PageRequest::new`] so the numbers are
/// always usable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Clamp `page` to at least 1 and `page_size` to `1..=max_page_size`.
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, max_page_size.max(1)),
        }
    }

    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size, page_size)
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
        }
    }

    /// `ceil(total_count / page_size)`
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.page_size as u64)
    }

    pub fn has_next(&self) -> bool {
        (self.page as u64) < self.total_pages()
    }
}
