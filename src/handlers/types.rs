//! # Common API Types
//!
//! Shared request and response shapes: page envelopes, list queries and
//! plain message responses.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::repositories::{Page, PageRequest};

/// Page envelope returned by every list endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// Items of the current page
    pub data: Vec<T>,
    /// 1-based page number
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn from_page<M>(page: Page<M>) -> Self
    where
        T: From<M>,
    {
        let page = page.map(T::from);
        Self {
            data: page.items,
            page: page.page,
            per_page: page.per_page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

/// Pagination query parameters
#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page number, starting at 1 (default 1)
    pub page: Option<u64>,
    /// Items per page, 1 to 100 (default 20)
    pub per_page: Option<u64>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

/// Confirmation message, with warnings for parts that did not go through
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_page_converts_items() {
        let page = Page {
            items: vec![1_u8, 2],
            page: 2,
            per_page: 2,
            total_items: 4,
            total_pages: 2,
        };

        let response: PaginatedResponse<u32> = PaginatedResponse::from_page(page);
        assert_eq!(response.data, vec![1, 2]);
        assert_eq!(response.total_pages, 2);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["per_page"], 2);
        assert_eq!(json["total_items"], 4);
    }

    #[test]
    fn message_omits_empty_warnings() {
        let json = serde_json::to_value(MessageResponse::new("Saved")).unwrap();
        assert_eq!(json, serde_json::json!({"message": "Saved"}));
    }
}
