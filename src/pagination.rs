//! Page-numbered listing helpers shared by the dashboard endpoints.

use serde::{Deserialize, Serialize};

pub const ORDERS_PER_PAGE: i64 = 10;
pub const CUSTOMERS_PER_PAGE: i64 = 15;
pub const TICKETS_PER_PAGE: i64 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
}

impl PageQuery {
    /// 1-based; anything below 1 is page 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self, per_page: i64) -> i64 {
        self.page().saturating_sub(1).saturating_mul(per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub items_per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, total_count: i64, items_per_page: i64) -> Self {
        Self {
            page,
            total_pages: (total_count + items_per_page - 1) / items_per_page,
            total_count,
            items_per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(PageQuery { page: None }.offset(10), 0);
        assert_eq!(PageQuery { page: Some(0) }.offset(10), 0);
        assert_eq!(PageQuery { page: Some(3) }.offset(15), 30);
        assert_eq!(PageQuery { page: Some(i64::MAX) }.offset(10), i64::MAX);
        assert_eq!(PageQuery { page: Some(i64::MIN) }.offset(10), 0);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Pagination::new(1, 0, 10).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(2, 11, 10).total_pages, 2);
    }
}
