//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Number of items on this page.
    pub count: usize,
}

/// Number of cache entries an invalidation removed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvalidationResponse {
    /// What was invalidated (an event id or a key prefix).
    pub target: String,
    /// Entries removed.
    pub removed: usize,
}

pub(crate) fn default_page() -> u32 {
    1
}

pub(crate) fn default_per_page() -> u32 {
    crate::domain::event::DEFAULT_PER_PAGE
}
