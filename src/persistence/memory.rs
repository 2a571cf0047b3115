//! In-memory [`EventRepository`] for tests and database-less runs.
//!
//! Besides the data itself it carries a small set of fault switches
//! (unavailable store, failing or slow per-event reads, failing writes) so
//! the ranking job's error paths can be driven deterministically.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::EventRepository;
use crate::domain::{
    EngagementCounts, EventId, EventListFilter, EventRanking, EventRecord, EventSort, EventStatus,
    EventSummary, RankedEvent,
};
use crate::error::RankingError;

#[derive(Debug, Default)]
struct State {
    events: BTreeMap<EventId, EventRecord>,
    counts: HashMap<EventId, EngagementCounts>,
    rankings: BTreeMap<EventId, EventRanking>,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    failing_counts: HashSet<EventId>,
    failing_upserts: HashSet<EventId>,
    slow_counts: HashMap<EventId, Duration>,
}

/// Thread-safe in-memory event store.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    state: RwLock<State>,
    faults: RwLock<Faults>,
}

impl InMemoryEventRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an event.
    pub async fn insert_event(&self, event: EventRecord) {
        self.state.write().await.events.insert(event.id, event);
    }

    /// Changes the status of an existing event. Returns `false` when the
    /// event is unknown.
    pub async fn set_status(&self, event_id: EventId, status: EventStatus) -> bool {
        let mut state = self.state.write().await;
        match state.events.get_mut(&event_id) {
            Some(event) => {
                event.status = status;
                true
            }
            None => false,
        }
    }

    /// Replaces the engagement counters of an event.
    pub async fn set_counts(&self, event_id: EventId, counts: EngagementCounts) {
        self.state.write().await.counts.insert(event_id, counts);
    }

    /// Returns every stored ranking row, ordered by rank position.
    pub async fn rankings(&self) -> Vec<EventRanking> {
        let state = self.state.read().await;
        let mut rows: Vec<EventRanking> = state.rankings.values().cloned().collect();
        rows.sort_by_key(|r| (r.rank_position, r.event_id));
        rows
    }

    /// Makes every operation fail with [`RankingError::DataSource`].
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.faults.write().await.unavailable = unavailable;
    }

    /// Makes counter reads of `event_id` fail.
    pub async fn fail_counts_for(&self, event_id: EventId) {
        self.faults.write().await.failing_counts.insert(event_id);
    }

    /// Makes ranking writes of `event_id` fail.
    pub async fn fail_upsert_for(&self, event_id: EventId) {
        self.faults.write().await.failing_upserts.insert(event_id);
    }

    /// Delays counter reads of `event_id` by `delay`.
    pub async fn delay_counts_for(&self, event_id: EventId, delay: Duration) {
        self.faults.write().await.slow_counts.insert(event_id, delay);
    }

    /// Clears every fault switch.
    pub async fn clear_faults(&self) {
        *self.faults.write().await = Faults::default();
    }

    async fn check_available(&self) -> Result<(), RankingError> {
        if self.faults.read().await.unavailable {
            return Err(RankingError::DataSource("event store unavailable".to_string()));
        }
        Ok(())
    }
}

fn ranked_event(event: &EventRecord, ranking: &EventRanking) -> RankedEvent {
    RankedEvent {
        title: event.title.clone(),
        city: event.city.clone(),
        event_date: event.event_date,
        ranking: ranking.clone(),
    }
}

fn compare_summaries(sort: EventSort, a: &EventSummary, b: &EventSummary) -> Ordering {
    let primary = match sort {
        EventSort::Date => match (a.event_date, b.event_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        EventSort::Popularity => match (a.score, b.score) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        EventSort::Newest => b.created_at.cmp(&a.created_at),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn list_eligible_events(&self) -> Result<Vec<EventRecord>, RankingError> {
        self.check_available().await?;
        let state = self.state.read().await;
        Ok(state
            .events
            .values()
            .filter(|e| e.status.is_rankable())
            .cloned()
            .collect())
    }

    async fn engagement_counts(&self, event_id: EventId) -> Result<EngagementCounts, RankingError> {
        self.check_available().await?;
        let (failing, delay) = {
            let faults = self.faults.read().await;
            (
                faults.failing_counts.contains(&event_id),
                faults.slow_counts.get(&event_id).copied(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(RankingError::DataSource(format!(
                "engagement read failed for event {event_id}"
            )));
        }
        let state = self.state.read().await;
        Ok(state.counts.get(&event_id).copied().unwrap_or_default())
    }

    async fn upsert_ranking(&self, ranking: &EventRanking) -> Result<(), RankingError> {
        self.check_available().await?;
        if self
            .faults
            .read()
            .await
            .failing_upserts
            .contains(&ranking.event_id)
        {
            return Err(RankingError::DataSource(format!(
                "ranking write failed for event {}",
                ranking.event_id
            )));
        }
        self.state
            .write()
            .await
            .rankings
            .insert(ranking.event_id, ranking.clone());
        Ok(())
    }

    async fn prune_rankings(&self, keep: &[EventId]) -> Result<u64, RankingError> {
        self.check_available().await?;
        let keep: HashSet<EventId> = keep.iter().copied().collect();
        let mut state = self.state.write().await;
        let before = state.rankings.len();
        state.rankings.retain(|id, _| keep.contains(id));
        Ok((before - state.rankings.len()) as u64)
    }

    async fn top_rankings(&self, limit: u32) -> Result<Vec<RankedEvent>, RankingError> {
        self.check_available().await?;
        let state = self.state.read().await;
        let mut rows: Vec<RankedEvent> = state
            .rankings
            .values()
            .filter_map(|ranking| {
                let event = state.events.get(&ranking.event_id)?;
                event
                    .status
                    .is_rankable()
                    .then(|| ranked_event(event, ranking))
            })
            .collect();
        rows.sort_by_key(|r| (r.ranking.rank_position, r.ranking.event_id));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn ranking_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<RankedEvent>, RankingError> {
        self.check_available().await?;
        let state = self.state.read().await;
        let Some(ranking) = state.rankings.get(&event_id) else {
            return Ok(None);
        };
        Ok(state
            .events
            .get(&event_id)
            .map(|event| ranked_event(event, ranking)))
    }

    async fn list_events(
        &self,
        filter: &EventListFilter,
    ) -> Result<Vec<EventSummary>, RankingError> {
        self.check_available().await?;
        let state = self.state.read().await;
        let mut rows: Vec<EventSummary> = state
            .events
            .values()
            .filter(|event| filter.matches(event))
            .map(|event| {
                let ranking = state.rankings.get(&event.id);
                EventSummary {
                    id: event.id,
                    title: event.title.clone(),
                    city: event.city.clone(),
                    status: event.status,
                    event_date: event.event_date,
                    event_time: event.event_time,
                    created_at: event.created_at,
                    score: ranking.map(|r| r.score),
                    rank_position: ranking.map(|r| r.rank_position),
                }
            })
            .collect();
        rows.sort_by(|a, b| compare_summaries(filter.sort, a, b));

        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(filter.per_page as usize)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn created(day: u32) -> DateTime<Utc> {
        let Some(ts) = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).single() else {
            panic!("valid timestamp");
        };
        ts
    }

    fn event(id: i64, title: &str, status: EventStatus, date: Option<(i32, u32, u32)>) -> EventRecord {
        EventRecord {
            id: EventId::new(id),
            title: title.to_string(),
            city: Some("Lisboa".to_string()),
            status,
            event_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            event_time: None,
            created_at: created(u32::try_from(id).unwrap_or(1)),
        }
    }

    fn ranking(id: i64, score: f64, rank_position: u32) -> EventRanking {
        EventRanking {
            event_id: EventId::new(id),
            score,
            registration_count: 0,
            view_count: 0,
            like_count: 0,
            share_count: 0,
            favorite_count: 0,
            days_until_event: None,
            hours_until_event: None,
            rank_position,
            calculated_at: created(20),
        }
    }

    async fn seeded() -> InMemoryEventRepository {
        let repo = InMemoryEventRepository::new();
        repo.insert_event(event(1, "Trail Sintra", EventStatus::Published, Some((2026, 6, 1))))
            .await;
        repo.insert_event(event(2, "Night Run", EventStatus::Draft, Some((2026, 5, 1))))
            .await;
        repo.insert_event(event(3, "Porto Marathon", EventStatus::Published, None))
            .await;
        repo.insert_event(event(4, "Cascais Triathlon", EventStatus::Cancelled, Some((2026, 7, 1))))
            .await;
        repo
    }

    #[tokio::test]
    async fn only_published_events_are_eligible() {
        let repo = seeded().await;
        let Ok(events) = repo.list_eligible_events().await else {
            panic!("listing failed");
        };
        let ids: Vec<i64> = events.iter().map(|e| e.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn missing_counts_are_zero() {
        let repo = seeded().await;
        let Ok(counts) = repo.engagement_counts(EventId::new(3)).await else {
            panic!("count read failed");
        };
        assert_eq!(counts, EngagementCounts::default());
    }

    #[tokio::test]
    async fn prune_keeps_listed_rows() {
        let repo = seeded().await;
        for row in [ranking(1, 10.0, 1), ranking(3, 5.0, 2), ranking(4, 1.0, 3)] {
            let Ok(()) = repo.upsert_ranking(&row).await else {
                panic!("upsert failed");
            };
        }
        let pruned = repo.prune_rankings(&[EventId::new(1), EventId::new(3)]).await;
        assert!(matches!(pruned, Ok(1)));
        assert_eq!(repo.rankings().await.len(), 2);
    }

    #[tokio::test]
    async fn top_rankings_hide_unpublished_events() {
        let repo = seeded().await;
        for row in [ranking(1, 10.0, 2), ranking(3, 50.0, 1), ranking(4, 1.0, 3)] {
            let Ok(()) = repo.upsert_ranking(&row).await else {
                panic!("upsert failed");
            };
        }
        let Ok(top) = repo.top_rankings(10).await else {
            panic!("top read failed");
        };
        let ids: Vec<i64> = top.iter().map(|r| r.ranking.event_id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(top.first().map(|r| r.title.as_str()), Some("Porto Marathon"));

        let Ok(one) = repo.top_rankings(1).await else {
            panic!("top read failed");
        };
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn list_events_filters_sorts_and_pages() {
        let repo = seeded().await;
        let filter = EventListFilter {
            status: Some(EventStatus::Published),
            ..EventListFilter::default()
        };
        let Ok(rows) = repo.list_events(&filter).await else {
            panic!("list failed");
        };
        let ids: Vec<i64> = rows.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);

        let newest = EventListFilter {
            sort: EventSort::Newest,
            per_page: 2,
            page: 2,
            ..EventListFilter::default()
        };
        let Ok(rows) = repo.list_events(&newest).await else {
            panic!("list failed");
        };
        let ids: Vec<i64> = rows.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn popularity_sort_puts_unranked_last() {
        let repo = seeded().await;
        let Ok(()) = repo.upsert_ranking(&ranking(3, 42.0, 1)).await else {
            panic!("upsert failed");
        };
        let filter = EventListFilter {
            sort: EventSort::Popularity,
            ..EventListFilter::default()
        };
        let Ok(rows) = repo.list_events(&filter).await else {
            panic!("list failed");
        };
        let Some((first, rest)) = rows.split_first() else {
            panic!("expected rows");
        };
        assert_eq!(first.id, EventId::new(3));
        assert_eq!(first.rank_position, Some(1));
        assert!(rest.iter().all(|r| r.score.is_none()));
    }

    #[tokio::test]
    async fn faults_surface_as_data_source_errors() {
        let repo = seeded().await;
        repo.fail_counts_for(EventId::new(1)).await;
        repo.fail_upsert_for(EventId::new(3)).await;
        assert!(matches!(
            repo.engagement_counts(EventId::new(1)).await,
            Err(RankingError::DataSource(_))
        ));
        assert!(matches!(
            repo.upsert_ranking(&ranking(3, 1.0, 1)).await,
            Err(RankingError::DataSource(_))
        ));

        repo.set_unavailable(true).await;
        assert!(repo.list_eligible_events().await.is_err());

        repo.clear_faults().await;
        assert!(repo.list_eligible_events().await.is_ok());
        assert!(repo.engagement_counts(EventId::new(1)).await.is_ok());
    }
}
