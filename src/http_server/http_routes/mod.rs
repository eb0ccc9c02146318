pub mod albums;
pub mod image;
pub mod models;
pub mod upload;

use serde::{Deserialize, Serialize};

use crate::services::query::PaginatedResult;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> From<&PaginatedResult<T>> for Pagination {
    fn from(result: &PaginatedResult<T>) -> Self {
        Self {
            page: result.page,
            limit: result.limit,
            total: result.total,
            total_pages: result.total_pages(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
