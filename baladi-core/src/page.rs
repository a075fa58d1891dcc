use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// 1-based page request. Callers clamp `per_page` against the configured cap
/// before building one.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}

/// One page of an ordered result set.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Slice an already-ordered full result set down to the requested page.
    pub fn from_items(all: Vec<T>, req: PageRequest) -> Self {
        let total = all.len() as u64;
        let per_page = req.per_page.max(1);
        let page = req.page.max(1);
        let total_pages = total.div_ceil(per_page as u64) as u32;
        let start = (page as usize - 1).saturating_mul(per_page as usize);
        let items: Vec<T> = all
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
            has_more: page < total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginates_and_reports_totals() {
        let page = Page::from_items((0..45).collect::<Vec<_>>(), PageRequest::new(2, 20));
        assert_eq!(page.items, (20..40).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_more);

        let last = Page::from_items((0..45).collect::<Vec<_>>(), PageRequest::new(3, 20));
        assert_eq!(last.items.len(), 5);
        assert!(!last.has_more);
    }

    #[test]
    fn page_beyond_the_end_is_empty() {
        let page = Page::from_items(vec![1, 2, 3], PageRequest::new(5, 10));
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_more);
    }

    #[test]
    fn empty_result_set() {
        let page = Page::from_items(Vec::<i32>::new(), PageRequest::new(1, 20));
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_more);
    }
}
