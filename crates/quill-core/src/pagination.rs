//! Offset pagination shared by every listing.

/// Posts per page on every paginated listing.
pub const DEFAULT_PER_PAGE: u64 = 10;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// Page numbers below 1 clamp to the first page. Pages whose offset
    /// would not fit a signed 64-bit SQL `OFFSET` clamp to the last such page.
    pub fn new(page: Option<u64>, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let last = i64::MAX as u64 / per_page;
        Self {
            page: page.unwrap_or(1).clamp(1, last),
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, DEFAULT_PER_PAGE)
    }
}

/// One page of items plus the total across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Slice an already ordered, fully materialised list.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.per_page as usize)
            .collect();
        Self {
            items,
            total,
            request,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}
