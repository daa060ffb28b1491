//! Pagination for record listings
//!
//! Out-of-range requests are normalized rather than rejected: page < 1
//! becomes 1, and a page size outside [1, 100] becomes the default.

/// Page size when none (or an invalid one) is requested
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Sanitized page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Normalize caller-supplied values
    ///
    /// # Examples
    /// ```
    /// use emotion_api::pagination::PageRequest;
    ///
    /// let p = PageRequest::sanitize(3, 10);
    /// assert_eq!((p.page, p.page_size, p.offset()), (3, 10, 20));
    ///
    /// let p = PageRequest::sanitize(0, 500);
    /// assert_eq!((p.page, p.page_size), (1, 20));
    /// ```
    pub fn sanitize(page: i64, page_size: i64) -> Self {
        let page = page.max(1);
        let page_size = if (1..=MAX_PAGE_SIZE).contains(&page_size) {
            page_size
        } else {
            DEFAULT_PAGE_SIZE
        };
        Self { page, page_size }
    }

    /// Rows to skip for SQL OFFSET
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::sanitize(1, DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = PageRequest::sanitize(2, 20);
        assert_eq!(p.page, 2);
        assert_eq!(p.page_size, 20);
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn test_pagination_first_page() {
        let p = PageRequest::sanitize(1, 50);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_page_below_one() {
        assert_eq!(PageRequest::sanitize(0, 20).page, 1);
        assert_eq!(PageRequest::sanitize(-4, 20).page, 1);
    }

    #[test]
    fn test_pagination_page_size_bounds() {
        assert_eq!(PageRequest::sanitize(1, 1).page_size, 1);
        assert_eq!(PageRequest::sanitize(1, 100).page_size, 100);
        assert_eq!(PageRequest::sanitize(1, 0).page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::sanitize(1, 101).page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::sanitize(1, -5).page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_huge_page_does_not_overflow() {
        let p = PageRequest::sanitize(i64::MAX, 100);
        assert_eq!(p.offset(), i64::MAX);
    }
}
