//! Page, page size, and total for one paginated view.

use tunedeck_api_models::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, PageParams, page_count};

/// Filter state owned by a paginated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistFilters {
    page: u32,
    page_size: u32,
    total: u64,
    is_fetching: bool,
}

impl Default for PlaylistFilters {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
            is_fetching: false,
        }
    }
}

impl PlaylistFilters {
    /// Filters starting at page one with the given page size.
    #[must_use]
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    /// Current one-based page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total rows reported by the last response.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Whether a fetch for the current page is running.
    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    /// Page count implied by the total and page size.
    #[must_use]
    pub const fn num_pages(&self) -> u64 {
        page_count(self.total, self.page_size as u64)
    }

    /// Parameters for the current page.
    #[must_use]
    pub fn params(&self) -> PageParams {
        PageParams::new(self.page, self.page_size)
    }

    /// Record the total from a response. Returns whether it changed.
    pub const fn update_total(&mut self, total: u64) -> bool {
        if self.total == total {
            return false;
        }
        self.total = total;
        true
    }

    /// Record whether the current page is being fetched.
    pub const fn update_fetching(&mut self, is_fetching: bool) {
        self.is_fetching = is_fetching;
    }

    /// Jump to `page`, clamped to at least one.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Change the page size; the view returns to page one.
    pub fn set_page_size(&mut self, page_size: u32) {
        let page_size = page_size.max(1);
        if page_size != self.page_size {
            self.page_size = page_size;
            self.page = DEFAULT_PAGE;
        }
    }

    /// Advance one page when another page exists. Returns whether it moved.
    pub fn next_page(&mut self) -> bool {
        if u64::from(self.page) < self.num_pages() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Step back one page when not on the first. Returns whether it moved.
    pub const fn previous_page(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }
}
