use openfilz_core::PageCriteria;

pub const DEFAULT_PAGE_SIZE: u32 = 70;

/// Zero-based page cursor over a listing whose total count comes from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_index: u32,
    page_size: u32,
    total_items: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.max(1),
            total_items: 0,
        }
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn total_pages(&self) -> u32 {
        let pages = self.total_items.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.page_index.saturating_add(1) < self.total_pages()
    }

    /// Fresh listing: back to the first page with a new total.
    pub fn restart(&mut self, total_items: u64) {
        self.page_index = 0;
        self.total_items = total_items;
    }

    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.page_index -= 1;
        true
    }

    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page_index += 1;
        true
    }

    pub fn go_to(&mut self, page_index: u32) -> bool {
        if page_index != 0 && page_index >= self.total_pages() {
            return false;
        }
        self.page_index = page_index;
        true
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
        self.page_index = 0;
    }

    /// Paging sent to the backend, which counts pages from 1.
    pub fn criteria(&self) -> PageCriteria {
        PageCriteria::new(self.page_index + 1, self.page_size)
    }
}
