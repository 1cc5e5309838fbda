use serde::Serialize;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

/// Resolved `page` / `per_page` query parameters (1-based pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = Pagination::from_query(None, None);
        assert_eq!((p.page, p.per_page, p.offset()), (1, 20, 0));
    }

    #[test]
    fn clamps_out_of_range_values() {
        let p = Pagination::from_query(Some(0), Some(1000));
        assert_eq!((p.page, p.per_page), (1, 100));

        let p = Pagination::from_query(Some(3), Some(0));
        assert_eq!((p.per_page, p.offset()), (1, 2));
    }

    #[test]
    fn offset_skips_previous_pages() {
        let p = Pagination::from_query(Some(4), Some(25));
        assert_eq!(p.offset(), 75);
        assert_eq!(p.limit(), 25);
    }
}
