//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain read models (`RankedEvent`, `EventSummary`, `CacheStats`) are
//! serialized as-is; the types here only wrap them with list metadata or
//! carry request parameters.

pub mod admin_dto;
pub mod common_dto;
pub mod event_dto;
pub mod highlight_dto;

pub use admin_dto::*;
pub use common_dto::*;
pub use event_dto::*;
pub use highlight_dto::*;
