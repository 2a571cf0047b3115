//! Service layer: business logic orchestration.
//!
//! [`RankingJob`] recomputes the popularity ranking from engagement data
//! read through [`MetricsReader`]; [`EventReadService`] serves the cached
//! read endpoints. Both depend on [`crate::persistence::EventRepository`]
//! and share one [`crate::cache::CacheLayer`].

pub mod metrics_reader;
pub mod ranking_job;
pub mod read_service;

pub use metrics_reader::MetricsReader;
pub use ranking_job::{PassOutcome, RankingJob, RankingStatus, RecomputeReport};
pub use read_service::{CacheTtls, EventPage, EventReadService, clamp_limit};
