//! Cache-aside layer in front of the relational reads.
//!
//! - [`store`]: the [`CacheStore`] backend seam and the in-process
//!   [`MemoryCacheStore`].
//! - [`keys`]: key namespaces and canonical key construction.
//! - [`layer`]: [`CacheLayer`], the typed cache-aside and invalidation API
//!   used by the services.
//!
//! The cache is never a source of truth. Every failure degrades to a miss.

pub mod keys;
pub mod layer;
pub mod store;

pub use layer::CacheLayer;
pub use store::{CacheStats, CacheStore, MemoryCacheStore};

/// Failures raised by cache backends. Never surfaced to API callers.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Entries must expire; a zero TTL was requested for the key.
    #[error("cache entry for {0} needs a non-zero ttl")]
    InvalidTtl(String),

    /// The backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}
