//! Cached read API: top-N highlights, per-event ranking detail and the
//! filtered event list, all served cache-aside.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::cache::keys::{event_list_key, event_ranking_key, highlights_key};
use crate::cache::{CacheLayer, CacheStats};
use crate::domain::{EventId, EventListFilter, EventSummary, RankedEvent};
use crate::error::RankingError;
use crate::persistence::EventRepository;

/// Highlight list size used when no maximum is configured.
pub const DEFAULT_MAX_HIGHLIGHTS: u32 = 10;

/// Time-to-live of each cached read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Highlight lists.
    pub highlights: Duration,
    /// Filtered event lists.
    pub event_list: Duration,
    /// Per-event ranking detail.
    pub event_detail: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            highlights: Duration::from_secs(60),
            event_list: Duration::from_secs(30),
            event_detail: Duration::from_secs(120),
        }
    }
}

/// One page of the filtered event list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventPage {
    /// 1-based page number actually served.
    pub page: u32,
    /// Page size actually served.
    pub per_page: u32,
    /// Events on this page.
    pub events: Vec<EventSummary>,
}

/// Clamps a requested highlight count to `[1, max]`; `None` means `max`.
#[must_use]
pub fn clamp_limit(requested: Option<i64>, max: u32) -> u32 {
    let max = max.max(1);
    match requested {
        None => max,
        Some(limit) => u32::try_from(limit.clamp(1, i64::from(max))).unwrap_or(max),
    }
}

/// Read-side service. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct EventReadService {
    repository: Arc<dyn EventRepository>,
    cache: CacheLayer,
    ttls: CacheTtls,
    max_highlights: u32,
}

impl EventReadService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EventRepository>,
        cache: CacheLayer,
        ttls: CacheTtls,
        max_highlights: u32,
    ) -> Self {
        Self {
            repository,
            cache,
            ttls,
            max_highlights: max_highlights.max(1),
        }
    }

    /// Largest highlight list served.
    #[must_use]
    pub const fn max_highlights(&self) -> u32 {
        self.max_highlights
    }

    /// Returns the top events by rank position. Out-of-range limits are
    /// clamped, never rejected.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] on a cache miss when the
    /// repository fails.
    pub async fn get_highlight_events(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<RankedEvent>, RankingError> {
        let limit = clamp_limit(limit, self.max_highlights);
        self.cache
            .cache_aside(&highlights_key(limit), self.ttls.highlights, || {
                self.repository.top_rankings(limit)
            })
            .await
    }

    /// Returns the ranking detail of one event.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::EventNotFound`] when the event has no
    /// ranking (nothing is cached then), or [`RankingError::DataSource`]
    /// when the repository fails.
    pub async fn get_event_ranking(&self, event_id: EventId) -> Result<RankedEvent, RankingError> {
        self.cache
            .cache_aside(
                &event_ranking_key(event_id),
                self.ttls.event_detail,
                || async move {
                    self.repository
                        .ranking_for_event(event_id)
                        .await?
                        .ok_or(RankingError::EventNotFound(event_id))
                },
            )
            .await
    }

    /// Returns one page of events matching `filter`. The filter is
    /// normalized first, so equivalent filters share a cache entry.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::InvalidRequest`] when `date_from` is after
    /// `date_to`, or [`RankingError::DataSource`] when the repository fails.
    pub async fn list_events(&self, filter: &EventListFilter) -> Result<EventPage, RankingError> {
        let filter = filter.normalized();
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to)
            && from > to
        {
            return Err(RankingError::InvalidRequest(format!(
                "date_from {from} is after date_to {to}"
            )));
        }
        self.cache
            .cache_aside(&event_list_key(&filter), self.ttls.event_list, || async {
                let events = self.repository.list_events(&filter).await?;
                Ok(EventPage {
                    page: filter.page,
                    per_page: filter.per_page,
                    events,
                })
            })
            .await
    }

    /// Drops every cached read a change to `event_id` can affect. Returns
    /// the number of entries removed.
    pub async fn invalidate_event_cache(&self, event_id: EventId) -> usize {
        self.cache.invalidate_event(event_id).await
    }

    /// Drops every cached key starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::InvalidRequest`] for a blank prefix.
    pub async fn invalidate_pattern(&self, prefix: &str) -> Result<usize, RankingError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(RankingError::InvalidRequest(
                "prefix must not be empty".to_string(),
            ));
        }
        Ok(self.cache.invalidate_pattern(prefix).await)
    }

    /// Cache counters.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};

    use crate::domain::{EventRanking, EventRecord, EventStatus};
    use crate::persistence::InMemoryEventRepository;

    fn record(id: i64, date: Option<NaiveDate>) -> EventRecord {
        EventRecord {
            id: EventId::new(id),
            title: format!("Ride {id}"),
            city: Some("Braga".to_string()),
            status: EventStatus::Published,
            event_date: date,
            event_time: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn ranking(id: i64, rank_position: u32) -> EventRanking {
        EventRanking {
            event_id: EventId::new(id),
            score: f64::from(100 - rank_position),
            registration_count: 1,
            view_count: 2,
            like_count: 3,
            share_count: 4,
            favorite_count: 5,
            days_until_event: Some(9),
            hours_until_event: Some(220),
            rank_position,
            calculated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    async fn seeded(events: i64) -> Arc<InMemoryEventRepository> {
        let repo = Arc::new(InMemoryEventRepository::new());
        for id in 1..=events {
            repo.insert_event(record(id, NaiveDate::from_ymd_opt(2026, 6, 1)))
                .await;
            let Ok(()) = repo
                .upsert_ranking(&ranking(id, u32::try_from(id).unwrap_or(1)))
                .await
            else {
                panic!("seed upsert failed");
            };
        }
        repo
    }

    fn service(repo: &Arc<InMemoryEventRepository>, cache: CacheLayer) -> EventReadService {
        let repository: Arc<dyn EventRepository> = Arc::clone(repo) as Arc<dyn EventRepository>;
        EventReadService::new(repository, cache, CacheTtls::default(), DEFAULT_MAX_HIGHLIGHTS)
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None, 10), 10);
        assert_eq!(clamp_limit(Some(50), 10), 10);
        assert_eq!(clamp_limit(Some(0), 10), 1);
        assert_eq!(clamp_limit(Some(-3), 10), 1);
        assert_eq!(clamp_limit(Some(4), 10), 4);
        assert_eq!(clamp_limit(Some(i64::MAX), 10), 10);
        assert_eq!(clamp_limit(Some(5), 0), 1);
    }

    #[tokio::test]
    async fn oversized_limit_serves_the_clamped_list() {
        let repo = seeded(12).await;
        let cache = CacheLayer::in_memory(100);
        let service = service(&repo, cache.clone());

        let Ok(top) = service.get_highlight_events(Some(50)).await else {
            panic!("highlights failed");
        };
        assert_eq!(top.len(), 10);
        let ranks: Vec<u32> = top.iter().map(|r| r.ranking.rank_position).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<u32>>());
        assert!(cache.get::<Vec<RankedEvent>>("highlights:top:10").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn highlights_are_served_from_cache_until_expiry() {
        let repo = seeded(2).await;
        let service = service(&repo, CacheLayer::in_memory(100));

        let Ok(first) = service.get_highlight_events(None).await else {
            panic!("highlights failed");
        };
        assert_eq!(first.len(), 2);

        repo.insert_event(record(3, None)).await;
        let Ok(()) = repo.upsert_ranking(&ranking(3, 3)).await else {
            panic!("upsert failed");
        };

        tokio::time::advance(Duration::from_secs(59)).await;
        let Ok(cached) = service.get_highlight_events(None).await else {
            panic!("highlights failed");
        };
        assert_eq!(cached, first);

        tokio::time::advance(Duration::from_secs(1)).await;
        let Ok(fresh) = service.get_highlight_events(None).await else {
            panic!("highlights failed");
        };
        assert_eq!(fresh.len(), 3);
    }

    #[tokio::test]
    async fn unranked_event_is_not_found_and_not_cached() {
        let repo = seeded(1).await;
        let cache = CacheLayer::in_memory(100);
        let service = service(&repo, cache.clone());

        let missing = service.get_event_ranking(EventId::new(9)).await;
        assert!(matches!(missing, Err(RankingError::EventNotFound(id)) if id.get() == 9));
        assert_eq!(cache.stats().await.entries, 0);

        let Ok(found) = service.get_event_ranking(EventId::new(1)).await else {
            panic!("ranking lookup failed");
        };
        assert_eq!(found.ranking.rank_position, 1);
        assert_eq!(found.title, "Ride 1");
    }

    #[tokio::test]
    async fn invalidation_exposes_fresh_ranking() {
        let repo = seeded(1).await;
        let service = service(&repo, CacheLayer::in_memory(100));
        let Ok(before) = service.get_event_ranking(EventId::new(1)).await else {
            panic!("ranking lookup failed");
        };

        let mut changed = ranking(1, 1);
        changed.score = 999.0;
        let Ok(()) = repo.upsert_ranking(&changed).await else {
            panic!("upsert failed");
        };
        let Ok(stale) = service.get_event_ranking(EventId::new(1)).await else {
            panic!("ranking lookup failed");
        };
        assert_eq!(stale, before);

        assert!(service.invalidate_event_cache(EventId::new(1)).await >= 1);
        let Ok(fresh) = service.get_event_ranking(EventId::new(1)).await else {
            panic!("ranking lookup failed");
        };
        assert_eq!(fresh.ranking.score, 999.0);
    }

    #[tokio::test]
    async fn equivalent_filters_share_one_entry() {
        let repo = seeded(3).await;
        let cache = CacheLayer::in_memory(100);
        let service = service(&repo, cache.clone());

        let a = EventListFilter {
            city: Some("  BRAGA ".to_string()),
            ..EventListFilter::default()
        };
        let b = EventListFilter {
            city: Some("braga".to_string()),
            search: Some(String::new()),
            ..EventListFilter::default()
        };
        let Ok(page_a) = service.list_events(&a).await else {
            panic!("list failed");
        };
        let Ok(page_b) = service.list_events(&b).await else {
            panic!("list failed");
        };
        assert_eq!(page_a, page_b);
        assert_eq!(page_a.events.len(), 3);
        assert_eq!(page_a.page, 1);
        assert_eq!(cache.stats().await.entries, 1);
    }

    #[tokio::test]
    async fn inverted_date_range_is_rejected() {
        let repo = seeded(1).await;
        let service = service(&repo, CacheLayer::in_memory(100));
        let filter = EventListFilter {
            date_from: NaiveDate::from_ymd_opt(2026, 7, 1),
            date_to: NaiveDate::from_ymd_opt(2026, 6, 1),
            ..EventListFilter::default()
        };
        assert!(matches!(
            service.list_events(&filter).await,
            Err(RankingError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn data_source_errors_propagate_and_are_not_cached() {
        let repo = seeded(1).await;
        let cache = CacheLayer::in_memory(100);
        let service = service(&repo, cache.clone());

        repo.set_unavailable(true).await;
        assert!(matches!(
            service.get_highlight_events(Some(3)).await,
            Err(RankingError::DataSource(_))
        ));
        assert_eq!(cache.stats().await.entries, 0);

        repo.set_unavailable(false).await;
        let Ok(top) = service.get_highlight_events(Some(3)).await else {
            panic!("highlights failed");
        };
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn blank_prefix_is_rejected() {
        let repo = seeded(1).await;
        let service = service(&repo, CacheLayer::in_memory(100));
        assert!(matches!(
            service.invalidate_pattern("  ").await,
            Err(RankingError::InvalidRequest(_))
        ));

        let Ok(_) = service.get_highlight_events(None).await else {
            panic!("highlights failed");
        };
        assert!(matches!(service.invalidate_pattern("highlights").await, Ok(1)));
    }
}
