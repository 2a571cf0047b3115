//! Ranking recompute job: one pass reads every eligible event, scores it,
//! assigns contiguous rank positions, upserts the ranking table, prunes
//! stale rows and drops ranking-derived cache entries.
//!
//! Passes are single-flight. A pass requested while another is running
//! returns [`PassOutcome::Skipped`] immediately instead of queueing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

use super::MetricsReader;
use crate::cache::CacheLayer;
use crate::domain::{
    Clock, EventId, EventRanking, EventRecord, ScoredEvent, assign_ranks, scoring,
};
use crate::error::RankingError;
use crate::persistence::EventRepository;

/// Summary of one completed ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecomputeReport {
    /// Unique identifier of the pass, also used in its log lines.
    pub pass_id: Uuid,
    /// The `now` every computation in the pass used.
    pub calculated_at: DateTime<Utc>,
    /// Eligible events found.
    pub eligible: usize,
    /// Events whose ranking row was written.
    pub ranked: usize,
    /// Events skipped because a read, write or time budget failed.
    pub failed: Vec<EventId>,
    /// Stale ranking rows deleted.
    pub pruned: u64,
    /// Cache entries dropped after the writes.
    pub cache_entries_invalidated: usize,
    /// Wall time of the pass in milliseconds.
    pub duration_ms: u64,
}

/// Result of asking for a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// The pass ran to completion.
    Completed(RecomputeReport),
    /// Another pass was already running; nothing was done.
    Skipped,
}

/// Snapshot of the job's progress, served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankingStatus {
    /// Whether a pass is running right now.
    pub running: bool,
    /// Passes completed since startup.
    pub completed_passes: u64,
    /// Report of the most recent completed pass.
    pub last_report: Option<RecomputeReport>,
}

/// Periodic popularity ranking recompute.
///
/// Shared as `Arc<RankingJob>` between the scheduler and the HTTP layer.
#[derive(Debug)]
pub struct RankingJob {
    repository: Arc<dyn EventRepository>,
    metrics: MetricsReader,
    cache: CacheLayer,
    clock: Arc<dyn Clock>,
    per_event_timeout: Duration,
    pass_guard: Mutex<()>,
    last_report: RwLock<Option<RecomputeReport>>,
    completed_passes: AtomicU64,
}

impl RankingJob {
    /// Creates a job. `per_event_timeout` bounds each event's counter read
    /// and each ranking write.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EventRepository>,
        cache: CacheLayer,
        clock: Arc<dyn Clock>,
        per_event_timeout: Duration,
    ) -> Self {
        Self {
            metrics: MetricsReader::new(Arc::clone(&repository)),
            repository,
            cache,
            clock,
            per_event_timeout,
            pass_guard: Mutex::new(()),
            last_report: RwLock::new(None),
            completed_passes: AtomicU64::new(0),
        }
    }

    /// Runs one ranking pass, or returns [`PassOutcome::Skipped`] when a
    /// pass is already in progress.
    ///
    /// Per-event failures and timeouts skip the event and are listed in the
    /// report. Ranking rows of events not ranked by the pass are deleted.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::DataSource`] when the eligible events cannot
    /// be listed. The ranking table is left untouched in that case.
    pub async fn recalculate_rankings(&self) -> Result<PassOutcome, RankingError> {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            tracing::info!("ranking pass already running; skipping");
            return Ok(PassOutcome::Skipped);
        };

        let started = Instant::now();
        let pass_id = Uuid::new_v4();
        let now = self.clock.now();
        tracing::info!(%pass_id, %now, "ranking pass started");

        let events = self
            .repository
            .list_eligible_events()
            .await
            .inspect_err(|err| {
                tracing::error!(%pass_id, error = %err, "ranking pass aborted: cannot list events");
            })?;

        let mut failed = Vec::new();
        let mut scored = Vec::with_capacity(events.len());
        for event in &events {
            match self.score_event(event, now).await {
                Ok(entry) => scored.push(entry),
                Err(err) => {
                    tracing::warn!(%pass_id, event_id = %event.id, error = %err, "event skipped");
                    failed.push(event.id);
                }
            }
            tokio::task::yield_now().await;
        }

        let rankings = assign_ranks(scored, now);
        let written = self.write_rankings(pass_id, rankings, &mut failed).await;

        let pruned = self.prune(pass_id, &events, &written).await;
        let cache_entries_invalidated = self.cache.invalidate_rankings().await;

        let report = RecomputeReport {
            pass_id,
            calculated_at: now,
            eligible: events.len(),
            ranked: written.len(),
            failed,
            pruned,
            cache_entries_invalidated,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            %pass_id,
            eligible = report.eligible,
            ranked = report.ranked,
            failed = report.failed.len(),
            pruned = report.pruned,
            duration_ms = report.duration_ms,
            "ranking pass finished"
        );

        *self.last_report.write().await = Some(report.clone());
        self.completed_passes.fetch_add(1, Ordering::Relaxed);
        Ok(PassOutcome::Completed(report))
    }

    /// Returns the job's progress.
    pub async fn status(&self) -> RankingStatus {
        RankingStatus {
            running: self.pass_guard.try_lock().is_err(),
            completed_passes: self.completed_passes(),
            last_report: self.last_report().await,
        }
    }

    /// Report of the most recent completed pass.
    pub async fn last_report(&self) -> Option<RecomputeReport> {
        self.last_report.read().await.clone()
    }

    /// Passes completed since the job was created.
    #[must_use]
    pub fn completed_passes(&self) -> u64 {
        self.completed_passes.load(Ordering::Relaxed)
    }

    async fn score_event(
        &self,
        event: &EventRecord,
        now: DateTime<Utc>,
    ) -> Result<ScoredEvent, RankingError> {
        let snapshot = tokio::time::timeout(self.per_event_timeout, self.metrics.snapshot(event, now))
            .await
            .map_err(|_| RankingError::Timeout(event.id))??;
        let score = scoring::score(&snapshot, now);
        Ok(ScoredEvent { snapshot, score })
    }

    /// Upserts `rankings` in rank order. When a write fails, the row is
    /// dropped, the rows that remain are renumbered to `1..=N` and those
    /// whose position moved are written again, until a round succeeds.
    /// Returns the ids of the rows left in the table.
    async fn write_rankings(
        &self,
        pass_id: Uuid,
        rankings: Vec<EventRanking>,
        failed: &mut Vec<EventId>,
    ) -> Vec<EventId> {
        let mut pending: Vec<(EventRanking, bool)> =
            rankings.into_iter().map(|ranking| (ranking, true)).collect();
        loop {
            let mut write_failed = false;
            let mut kept = Vec::with_capacity(pending.len());
            for (ranking, dirty) in pending {
                if !dirty {
                    kept.push((ranking, false));
                    continue;
                }
                let result = tokio::time::timeout(
                    self.per_event_timeout,
                    self.repository.upsert_ranking(&ranking),
                )
                .await
                .unwrap_or(Err(RankingError::Timeout(ranking.event_id)));
                match result {
                    Ok(()) => kept.push((ranking, false)),
                    Err(err) => {
                        tracing::warn!(
                            %pass_id,
                            event_id = %ranking.event_id,
                            error = %err,
                            "ranking write failed"
                        );
                        failed.push(ranking.event_id);
                        write_failed = true;
                    }
                }
            }
            pending = kept;
            if !write_failed {
                break;
            }
            for ((ranking, dirty), position) in pending.iter_mut().zip(1u32..) {
                if ranking.rank_position != position {
                    ranking.rank_position = position;
                    *dirty = true;
                }
            }
        }
        pending.into_iter().map(|(ranking, _)| ranking.event_id).collect()
    }

    /// Deletes ranking rows of events not written by this pass. When every
    /// eligible event failed the table is kept as is.
    async fn prune(&self, pass_id: Uuid, events: &[EventRecord], written: &[EventId]) -> u64 {
        if written.is_empty() && !events.is_empty() {
            tracing::warn!(%pass_id, "no ranking written; keeping existing rows");
            return 0;
        }
        match self.repository.prune_rankings(written).await {
            Ok(pruned) => pruned,
            Err(err) => {
                tracing::warn!(%pass_id, error = %err, "stale ranking prune failed");
                0
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    use crate::domain::{EngagementCounts, EventStatus, FixedClock};
    use crate::persistence::InMemoryEventRepository;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn now() -> DateTime<Utc> {
        let Some(ts) = Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).single() else {
            panic!("valid timestamp");
        };
        ts
    }

    fn event(id: i64, date: Option<NaiveDate>, created_at: DateTime<Utc>) -> EventRecord {
        EventRecord {
            id: EventId::new(id),
            title: format!("Race {id}"),
            city: Some("Coimbra".to_string()),
            status: EventStatus::Published,
            event_date: date,
            event_time: None,
            created_at,
        }
    }

    fn popular_counts() -> EngagementCounts {
        EngagementCounts {
            registrations: 10,
            views: 100,
            likes: 5,
            shares: 0,
            favorites: 2,
        }
    }

    /// Three days out, created now: scores 253.8.
    async fn add_popular(repo: &InMemoryEventRepository, id: i64) {
        repo.insert_event(event(id, NaiveDate::from_ymd_opt(2026, 4, 13), now()))
            .await;
        repo.set_counts(EventId::new(id), popular_counts()).await;
    }

    /// Undated, created a month ago: scores registrations * 10.
    async fn add_plain(repo: &InMemoryEventRepository, id: i64, registrations: u64) {
        let Some(created) = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single() else {
            panic!("valid timestamp");
        };
        repo.insert_event(event(id, None, created)).await;
        repo.set_counts(
            EventId::new(id),
            EngagementCounts {
                registrations,
                ..EngagementCounts::default()
            },
        )
        .await;
    }

    fn job(repo: &Arc<InMemoryEventRepository>, cache: CacheLayer) -> RankingJob {
        let repository: Arc<dyn EventRepository> = Arc::clone(repo) as Arc<dyn EventRepository>;
        RankingJob::new(repository, cache, Arc::new(FixedClock::new(now())), TIMEOUT)
    }

    async fn completed(job: &RankingJob) -> RecomputeReport {
        match job.recalculate_rankings().await {
            Ok(PassOutcome::Completed(report)) => report,
            other => panic!("expected a completed pass, got {other:?}"),
        }
    }

    fn positions(rows: &[EventRanking]) -> Vec<(i64, u32)> {
        rows.iter()
            .map(|r| (r.event_id.get(), r.rank_position))
            .collect()
    }

    #[tokio::test]
    async fn worked_example_scores_and_ties() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_popular(&repo, 5).await;
        add_plain(&repo, 7, 8).await;
        add_popular(&repo, 3).await;
        let job = job(&repo, CacheLayer::in_memory(100));

        let report = completed(&job).await;
        assert_eq!(report.eligible, 3);
        assert_eq!(report.ranked, 3);
        assert!(report.failed.is_empty());
        assert_eq!(report.calculated_at, now());

        let rows = repo.rankings().await;
        assert_eq!(positions(&rows), vec![(3, 1), (5, 2), (7, 3)]);
        let scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![253.8, 253.8, 80.0]);
        assert!(rows.iter().all(|r| r.calculated_at == now()));
        let Some(top) = rows.first() else {
            panic!("expected rows");
        };
        assert_eq!(top.registration_count, 10);
        assert_eq!(top.days_until_event, Some(3));
        assert_eq!(top.hours_until_event, Some(72));
    }

    #[tokio::test]
    async fn ineligible_events_lose_their_row() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 3).await;
        add_plain(&repo, 2, 2).await;
        add_plain(&repo, 3, 1).await;
        let job = job(&repo, CacheLayer::in_memory(100));
        completed(&job).await;
        assert_eq!(repo.rankings().await.len(), 3);

        assert!(repo.set_status(EventId::new(1), EventStatus::Cancelled).await);
        let report = completed(&job).await;
        assert_eq!(report.pruned, 1);
        assert_eq!(positions(&repo.rankings().await), vec![(2, 1), (3, 2)]);
    }

    #[tokio::test]
    async fn failing_event_is_skipped_and_ranks_stay_contiguous() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        add_plain(&repo, 2, 9).await;
        add_plain(&repo, 3, 1).await;
        repo.fail_counts_for(EventId::new(2)).await;
        let job = job(&repo, CacheLayer::in_memory(100));

        let report = completed(&job).await;
        assert_eq!(report.failed, vec![EventId::new(2)]);
        assert_eq!(report.ranked, 2);
        assert_eq!(positions(&repo.rankings().await), vec![(1, 1), (3, 2)]);
    }

    #[tokio::test]
    async fn failed_write_drops_the_row() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        add_plain(&repo, 2, 9).await;
        let job = job(&repo, CacheLayer::in_memory(100));
        completed(&job).await;

        repo.fail_upsert_for(EventId::new(1)).await;
        let report = completed(&job).await;
        assert_eq!(report.failed, vec![EventId::new(1)]);
        assert_eq!(positions(&repo.rankings().await), vec![(2, 1)]);
    }

    #[tokio::test]
    async fn failed_top_write_renumbers_the_rest() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 9).await;
        add_plain(&repo, 2, 5).await;
        add_plain(&repo, 3, 1).await;
        repo.fail_upsert_for(EventId::new(1)).await;
        let job = job(&repo, CacheLayer::in_memory(100));

        let report = completed(&job).await;
        assert_eq!(report.failed, vec![EventId::new(1)]);
        assert_eq!(report.ranked, 2);
        assert_eq!(positions(&repo.rankings().await), vec![(2, 1), (3, 2)]);
    }

    #[tokio::test]
    async fn failed_middle_write_after_previous_pass_keeps_positions_contiguous() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 9).await;
        add_plain(&repo, 2, 5).await;
        add_plain(&repo, 3, 3).await;
        add_plain(&repo, 4, 1).await;
        let job = job(&repo, CacheLayer::in_memory(100));
        completed(&job).await;

        repo.fail_upsert_for(EventId::new(2)).await;
        let report = completed(&job).await;
        assert_eq!(report.failed, vec![EventId::new(2)]);
        assert_eq!(report.pruned, 1);
        assert_eq!(
            positions(&repo.rankings().await),
            vec![(1, 1), (3, 2), (4, 3)]
        );
    }

    #[tokio::test]
    async fn listing_failure_aborts_and_keeps_table() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        add_plain(&repo, 2, 9).await;
        let job = job(&repo, CacheLayer::in_memory(100));
        completed(&job).await;
        let before = repo.rankings().await;

        repo.set_unavailable(true).await;
        let result = job.recalculate_rankings().await;
        assert!(matches!(result, Err(RankingError::DataSource(_))));
        assert_eq!(repo.rankings().await, before);
        assert_eq!(job.completed_passes(), 1);
    }

    #[tokio::test]
    async fn all_events_failing_keeps_table() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        let job = job(&repo, CacheLayer::in_memory(100));
        completed(&job).await;

        repo.fail_counts_for(EventId::new(1)).await;
        let report = completed(&job).await;
        assert_eq!(report.ranked, 0);
        assert_eq!(report.pruned, 0);
        assert_eq!(repo.rankings().await.len(), 1);
    }

    #[tokio::test]
    async fn no_eligible_events_empties_table() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        let job = job(&repo, CacheLayer::in_memory(100));
        completed(&job).await;

        assert!(repo.set_status(EventId::new(1), EventStatus::Finished).await);
        let report = completed(&job).await;
        assert_eq!(report.eligible, 0);
        assert_eq!(report.pruned, 1);
        assert!(repo.rankings().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_event_times_out() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        add_plain(&repo, 2, 9).await;
        repo.delay_counts_for(EventId::new(1), Duration::from_secs(60))
            .await;
        let job = job(&repo, CacheLayer::in_memory(100));

        let report = completed(&job).await;
        assert_eq!(report.failed, vec![EventId::new(1)]);
        assert_eq!(positions(&repo.rankings().await), vec![(2, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_request_is_skipped() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        repo.delay_counts_for(EventId::new(1), Duration::from_secs(2))
            .await;
        let job = Arc::new(job(&repo, CacheLayer::in_memory(100)));

        let running = Arc::clone(&job);
        let first = tokio::spawn(async move { running.recalculate_rankings().await });
        tokio::task::yield_now().await;
        assert!(job.status().await.running);

        let second = job.recalculate_rankings().await;
        assert!(matches!(second, Ok(PassOutcome::Skipped)));

        let Ok(Ok(PassOutcome::Completed(report))) = first.await else {
            panic!("first pass should complete");
        };
        assert_eq!(report.ranked, 1);
        assert_eq!(job.completed_passes(), 1);
        assert!(!job.status().await.running);
    }

    #[tokio::test]
    async fn pass_invalidates_ranking_cache() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        let cache = CacheLayer::in_memory(100);
        let ttl = Duration::from_secs(60);
        assert!(cache.set("highlights:top:10", &vec![1u8], ttl).await);
        assert!(cache.set("rankings:event:1", &1u8, ttl).await);
        assert!(cache.set("other:1", &1u8, ttl).await);
        let job = job(&repo, cache.clone());

        let report = completed(&job).await;
        assert_eq!(report.cache_entries_invalidated, 2);
        assert_eq!(cache.get::<Vec<u8>>("highlights:top:10").await, None);
        assert_eq!(cache.get::<u8>("other:1").await, Some(1));
    }

    #[tokio::test]
    async fn status_tracks_last_report() {
        let repo = Arc::new(InMemoryEventRepository::new());
        add_plain(&repo, 1, 5).await;
        let job = job(&repo, CacheLayer::in_memory(100));
        assert_eq!(job.status().await.last_report, None);

        let first = completed(&job).await;
        let second = completed(&job).await;
        assert_ne!(first.pass_id, second.pass_id);

        let status = job.status().await;
        assert_eq!(status.completed_passes, 2);
        assert_eq!(status.last_report, Some(second));
    }
}
