use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// 1-indexed page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub number: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(number: usize, size: usize) -> Result<Self> {
        let page = Self { number, size };
        page.validate()?;
        Ok(page)
    }

    pub fn first(size: usize) -> Result<Self> {
        Self::new(1, size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(DashboardError::invalid_parameter(
                "page_size",
                "must be at least 1",
            ));
        }
        if self.number == 0 {
            return Err(DashboardError::invalid_parameter(
                "page",
                "pages are numbered from 1",
            ));
        }
        Ok(())
    }
}

/// One page of a result plus totals over the whole result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice `[(n-1)p, np)` out of `items`. A page past the end is empty.
    pub fn paginate(items: Vec<T>, request: PageRequest) -> Self {
        let total_count = items.len();
        let total_pages = total_count.div_ceil(request.size);
        let start = (request.number - 1).saturating_mul(request.size);

        let items = items
            .into_iter()
            .skip(start)
            .take(request.size)
            .collect();

        Self {
            items,
            page: request.number,
            page_size: request.size,
            total_count,
            total_pages,
        }
    }

    /// Everything as page 1. An empty result has zero pages.
    pub fn single(items: Vec<T>) -> Self {
        let total_count = items.len();
        Self {
            items,
            page: 1,
            page_size: total_count,
            total_count,
            total_pages: usize::from(total_count > 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}
