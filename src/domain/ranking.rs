//! Persisted rankings and rank assignment.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, EventMetricsSnapshot};

/// A snapshot together with its score, before rank assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEvent {
    /// The metrics the score was computed from.
    pub snapshot: EventMetricsSnapshot,
    /// Popularity score.
    pub score: f64,
}

/// One row of the `event_rankings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventRanking {
    /// Ranked event.
    pub event_id: EventId,
    /// Popularity score; higher is more popular.
    pub score: f64,
    /// Active registrations at calculation time.
    pub registration_count: u64,
    /// Views at calculation time.
    pub view_count: u64,
    /// Likes at calculation time.
    pub like_count: u64,
    /// Shares at calculation time.
    pub share_count: u64,
    /// Favorites at calculation time.
    pub favorite_count: u64,
    /// Days until start at calculation time.
    pub days_until_event: Option<i64>,
    /// Hours until start at calculation time.
    pub hours_until_event: Option<i64>,
    /// 1-based position; 1 is the most popular event.
    pub rank_position: u32,
    /// When the pass that produced this row ran.
    pub calculated_at: DateTime<Utc>,
}

/// Ranking row joined with the event fields shown in highlight lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankedEvent {
    /// Event title.
    pub title: String,
    /// Event city, if known.
    pub city: Option<String>,
    /// Scheduled date.
    pub event_date: Option<NaiveDate>,
    /// The ranking itself.
    #[serde(flatten)]
    pub ranking: EventRanking,
}

/// Orders scored events by score descending, breaking ties by ascending
/// event id, and assigns positions `1..=N` in that order.
#[must_use]
pub fn assign_ranks(mut scored: Vec<ScoredEvent>, calculated_at: DateTime<Utc>) -> Vec<EventRanking> {
    scored.sort_by(compare_for_rank);
    scored
        .into_iter()
        .zip(1u32..)
        .map(|(event, rank_position)| {
            let counts = event.snapshot.counts;
            EventRanking {
                event_id: event.snapshot.event_id,
                score: event.score,
                registration_count: counts.registrations,
                view_count: counts.views,
                like_count: counts.likes,
                share_count: counts.shares,
                favorite_count: counts.favorites,
                days_until_event: event.snapshot.days_until_event,
                hours_until_event: event.snapshot.hours_until_event,
                rank_position,
                calculated_at,
            }
        })
        .collect()
}

fn compare_for_rank(a: &ScoredEvent, b: &ScoredEvent) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.snapshot.event_id.cmp(&b.snapshot.event_id))
}
