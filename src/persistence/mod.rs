//! Persistence layer: relational reads of event and engagement data, and
//! the `event_rankings` table owned by the ranking job.
//!
//! [`EventRepository`] is the seam the services depend on. The concrete
//! implementations are [`PostgresEventRepository`] (`sqlx::PgPool`) and
//! [`InMemoryEventRepository`] for tests and database-less runs.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

pub use memory::InMemoryEventRepository;
pub use postgres::PostgresEventRepository;

use crate::domain::{
    EngagementCounts, EventId, EventListFilter, EventRanking, EventRecord, EventSummary,
    RankedEvent,
};
use crate::error::RankingError;

/// Data access used by the ranking job and the cached read API.
///
/// Every method is a single read or write; none of them touch the cache.
#[async_trait]
pub trait EventRepository: Send + Sync + std::fmt::Debug {
    /// Lists every event eligible for ranking (published), ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the store cannot be read.
    async fn list_eligible_events(&self) -> Result<Vec<EventRecord>, RankingError>;

    /// Returns the engagement counters of one event; zero for absent rows.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the store cannot be read.
    async fn engagement_counts(&self, event_id: EventId) -> Result<EngagementCounts, RankingError>;

    /// Inserts or overwrites the ranking row of `ranking.event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the write fails.
    async fn upsert_ranking(&self, ranking: &EventRanking) -> Result<(), RankingError>;

    /// Deletes every ranking row whose event is not in `keep` and returns
    /// the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the write fails.
    async fn prune_rankings(&self, keep: &[EventId]) -> Result<u64, RankingError>;

    /// Returns the best `limit` ranked events that are still published,
    /// ordered by rank position.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the store cannot be read.
    async fn top_rankings(&self, limit: u32) -> Result<Vec<RankedEvent>, RankingError>;

    /// Returns the ranking of one event, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the store cannot be read.
    async fn ranking_for_event(&self, event_id: EventId)
    -> Result<Option<RankedEvent>, RankingError>;

    /// Returns one page of events matching a normalized filter.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the store cannot be read.
    async fn list_events(&self, filter: &EventListFilter)
    -> Result<Vec<EventSummary>, RankingError>;
}
