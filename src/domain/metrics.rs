//! Engagement counters and the per-pass metrics snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, EventRecord};

/// Raw engagement counters for one event. Absent rows count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    /// Active (non-cancelled) registrations.
    pub registrations: u64,
    /// Detail page views.
    pub views: u64,
    /// Likes.
    pub likes: u64,
    /// Shares.
    pub shares: u64,
    /// Favorites.
    pub favorites: u64,
}

/// Signed distance from "now" to an event's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeToEvent {
    /// Whole days, floored. Negative once the event has started.
    pub days: i64,
    /// Whole hours, floored. Negative once the event has started.
    pub hours: i64,
}

impl TimeToEvent {
    /// Computes the floored distance between `now` and `starts_at`.
    #[must_use]
    pub fn between(now: DateTime<Utc>, starts_at: DateTime<Utc>) -> Self {
        let minutes = (starts_at - now).num_minutes();
        let hours = minutes.div_euclid(60);
        Self {
            days: hours.div_euclid(24),
            hours,
        }
    }
}

/// Everything the scoring function needs about one event, captured once per
/// ranking pass and discarded after scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetricsSnapshot {
    /// Event the counters belong to.
    pub event_id: EventId,
    /// Engagement counters.
    pub counts: EngagementCounts,
    /// Days until start; `None` for events without a date.
    pub days_until_event: Option<i64>,
    /// Hours until start; `None` for events without a date.
    pub hours_until_event: Option<i64>,
    /// Creation time of the event, for the recency bonus.
    pub event_created_at: DateTime<Utc>,
}

impl EventMetricsSnapshot {
    /// Builds a snapshot for `event` from its counters, relative to `now`.
    #[must_use]
    pub fn new(event: &EventRecord, counts: EngagementCounts, now: DateTime<Utc>) -> Self {
        let time_to_event = event
            .starts_at()
            .map(|starts_at| TimeToEvent::between(now, starts_at));
        Self {
            event_id: event.id,
            counts,
            days_until_event: time_to_event.map(|t| t.days),
            hours_until_event: time_to_event.map(|t| t.hours),
            event_created_at: event.created_at,
        }
    }
}
