//! Popularity scoring.
//!
//! ```text
//! base  = registrations*10 + views*0.1 + likes*5 + shares*8 + favorites*3
//! score = round2(base * time_bonus(days_until_event) * recency_bonus(created_at))
//! ```
//!
//! The function is pure: identical snapshot and identical `now` give an
//! identical score.
//!
//! # Time bonus
//!
//! | Days until start      | Multiplier |
//! |-----------------------|------------|
//! | 0–1                   | 2.0        |
//! | 2–3                   | 1.5        |
//! | 4–7                   | 1.3        |
//! | 8–14                  | 1.1        |
//! | > 14, past or undated | 1.0        |
//!
//! # Recency bonus
//!
//! `1.0 + 0.2 * (7 - d) / 7` for an event created `d` whole days ago,
//! `1.0` from day 7 on.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::EventMetricsSnapshot;

/// Points per active registration.
pub const REGISTRATION_WEIGHT: f64 = 10.0;
/// Points per view.
pub const VIEW_WEIGHT: f64 = 0.1;
/// Points per like.
pub const LIKE_WEIGHT: f64 = 5.0;
/// Points per share.
pub const SHARE_WEIGHT: f64 = 8.0;
/// Points per favorite.
pub const FAVORITE_WEIGHT: f64 = 3.0;

/// Largest recency multiplier, granted on the creation day.
pub const MAX_RECENCY_BONUS: f64 = 1.2;
/// Days after creation at which the recency bonus reaches 1.0.
pub const RECENCY_WINDOW_DAYS: i64 = 7;

/// Intermediate values of one score computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Weighted engagement sum.
    pub base: f64,
    /// Multiplier for events starting soon.
    pub time_bonus: f64,
    /// Multiplier for recently created events.
    pub recency_bonus: f64,
    /// Final score, rounded to two decimals.
    pub score: f64,
}

/// Weighted engagement sum of a snapshot.
#[must_use]
pub fn base_score(snapshot: &EventMetricsSnapshot) -> f64 {
    let c = &snapshot.counts;
    c.registrations as f64 * REGISTRATION_WEIGHT
        + c.views as f64 * VIEW_WEIGHT
        + c.likes as f64 * LIKE_WEIGHT
        + c.shares as f64 * SHARE_WEIGHT
        + c.favorites as f64 * FAVORITE_WEIGHT
}

/// Multiplier in `[1.0, 2.0]`, non-increasing in `days_until_event`.
#[must_use]
pub fn time_bonus(days_until_event: Option<i64>) -> f64 {
    match days_until_event {
        Some(0..=1) => 2.0,
        Some(2..=3) => 1.5,
        Some(4..=7) => 1.3,
        Some(8..=14) => 1.1,
        _ => 1.0,
    }
}

/// Multiplier in `[1.0, MAX_RECENCY_BONUS]` decaying linearly over
/// [`RECENCY_WINDOW_DAYS`]. Creation times in the future count as today.
#[must_use]
pub fn recency_bonus(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_days().max(0);
    if age_days >= RECENCY_WINDOW_DAYS {
        return 1.0;
    }
    let remaining = (RECENCY_WINDOW_DAYS - age_days) as f64 / RECENCY_WINDOW_DAYS as f64;
    1.0 + (MAX_RECENCY_BONUS - 1.0) * remaining
}

/// Scores a snapshot and returns every intermediate value.
#[must_use]
pub fn score_breakdown(snapshot: &EventMetricsSnapshot, now: DateTime<Utc>) -> ScoreBreakdown {
    let base = base_score(snapshot);
    let time_bonus = time_bonus(snapshot.days_until_event);
    let recency_bonus = recency_bonus(snapshot.event_created_at, now);
    ScoreBreakdown {
        base,
        time_bonus,
        recency_bonus,
        score: round2(base * time_bonus * recency_bonus),
    }
}

/// Popularity score of a snapshot at `now`.
#[must_use]
pub fn score(snapshot: &EventMetricsSnapshot, now: DateTime<Utc>) -> f64 {
    score_breakdown(snapshot, now).score
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
