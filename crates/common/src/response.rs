//! Success envelope and pagination shared by every list endpoint

use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};

/// `{"success": true, "data": ..., "meta": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    pub data: T,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    pub fn page(data: T, pagination: &Pagination, total: u64) -> Self {
        Self {
            success: true,
            data,
            meta: Some(PageMeta {
                page: pagination.page(),
                per_page: pagination.per_page(),
                total,
                total_pages: total.div_ceil(pagination.per_page()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// `?page=&per_page=` query parameters, 1-based
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Zero-based page index, as SeaORM paginators expect
    pub fn page_index(&self) -> u64 {
        self.page() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamp() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), DEFAULT_PAGE_SIZE);

        let p = Pagination::new(0, 10_000);
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), MAX_PAGE_SIZE);
        assert_eq!(p.page_index(), 0);
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(body["success"], true);
        assert!(body.get("meta").is_none());

        let paged = ApiResponse::page(vec![1], &Pagination::new(2, 10), 25);
        let body = serde_json::to_value(paged).unwrap();
        assert_eq!(body["meta"]["total_pages"], 3);
        assert_eq!(body["meta"]["page"], 2);
    }
}
