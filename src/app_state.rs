//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::cache::CacheLayer;
use crate::config::ServiceConfig;
use crate::domain::Clock;
use crate::persistence::EventRepository;
use crate::service::{EventReadService, RankingJob};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Cached read endpoints and cache administration.
    pub read_service: EventReadService,
    /// Ranking job, for on-demand passes and status.
    pub ranking_job: Arc<RankingJob>,
}

impl AppState {
    /// Wires the read service and the ranking job over one repository and
    /// one cache, using the limits and TTLs of `config`.
    #[must_use]
    pub fn build(
        repository: Arc<dyn EventRepository>,
        cache: CacheLayer,
        clock: Arc<dyn Clock>,
        config: &ServiceConfig,
    ) -> Self {
        let read_service = EventReadService::new(
            Arc::clone(&repository),
            cache.clone(),
            config.cache_ttls(),
            config.highlights_max_limit,
        );
        let ranking_job = Arc::new(RankingJob::new(
            repository,
            cache,
            clock,
            config.ranking_event_timeout(),
        ));
        Self {
            read_service,
            ranking_job,
        }
    }
}
