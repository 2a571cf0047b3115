//! Database row models and their conversion into domain types.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

use crate::domain::{EventId, EventRanking, EventRecord, EventStatus, EventSummary, RankedEvent};
use crate::error::RankingError;

/// A row of the `events` table, restricted to the columns read here.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: i64,
    /// Title.
    pub title: String,
    /// City.
    pub city: Option<String>,
    /// Status text (`draft`, `published`, `cancelled`, `finished`).
    pub status: String,
    /// Scheduled date.
    pub event_date: Option<NaiveDate>,
    /// Scheduled time of day.
    pub event_time: Option<NaiveTime>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = RankingError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::new(row.id),
            status: parse_status(&row.status)?,
            title: row.title,
            city: row.city,
            event_date: row.event_date,
            event_time: row.event_time,
            created_at: row.created_at,
        })
    }
}

/// An `events` row left-joined with its ranking.
#[derive(Debug, Clone, FromRow)]
pub struct EventSummaryRow {
    /// Primary key.
    pub id: i64,
    /// Title.
    pub title: String,
    /// City.
    pub city: Option<String>,
    /// Status text.
    pub status: String,
    /// Scheduled date.
    pub event_date: Option<NaiveDate>,
    /// Scheduled time of day.
    pub event_time: Option<NaiveTime>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest score, if ranked.
    pub score: Option<f64>,
    /// Latest rank position, if ranked.
    pub rank_position: Option<i32>,
}

impl TryFrom<EventSummaryRow> for EventSummary {
    type Error = RankingError;

    fn try_from(row: EventSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::new(row.id),
            status: parse_status(&row.status)?,
            title: row.title,
            city: row.city,
            event_date: row.event_date,
            event_time: row.event_time,
            created_at: row.created_at,
            score: row.score,
            rank_position: row.rank_position.and_then(|p| u32::try_from(p).ok()),
        })
    }
}

/// An `event_rankings` row joined with the event's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct RankedEventRow {
    /// Ranked event.
    pub event_id: i64,
    /// Event title.
    pub title: String,
    /// Event city.
    pub city: Option<String>,
    /// Event date.
    pub event_date: Option<NaiveDate>,
    /// Score.
    pub score: f64,
    /// Registration count.
    pub registration_count: i64,
    /// View count.
    pub view_count: i64,
    /// Like count.
    pub like_count: i64,
    /// Share count.
    pub share_count: i64,
    /// Favorite count.
    pub favorite_count: i64,
    /// Days until start.
    pub days_until_event: Option<i64>,
    /// Hours until start.
    pub hours_until_event: Option<i64>,
    /// Rank position.
    pub rank_position: i32,
    /// Pass timestamp.
    pub calculated_at: DateTime<Utc>,
}

impl From<RankedEventRow> for RankedEvent {
    fn from(row: RankedEventRow) -> Self {
        Self {
            title: row.title,
            city: row.city,
            event_date: row.event_date,
            ranking: EventRanking {
                event_id: EventId::new(row.event_id),
                score: row.score,
                registration_count: to_count(row.registration_count),
                view_count: to_count(row.view_count),
                like_count: to_count(row.like_count),
                share_count: to_count(row.share_count),
                favorite_count: to_count(row.favorite_count),
                days_until_event: row.days_until_event,
                hours_until_event: row.hours_until_event,
                rank_position: u32::try_from(row.rank_position).unwrap_or(0),
                calculated_at: row.calculated_at,
            },
        }
    }
}

/// Converts a database `BIGINT` count into a counter; negatives clamp to 0.
#[must_use]
pub fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Converts a counter into a database `BIGINT`, saturating.
#[must_use]
pub fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn parse_status(raw: &str) -> Result<EventStatus, RankingError> {
    raw.parse().map_err(RankingError::DataSource)
}
