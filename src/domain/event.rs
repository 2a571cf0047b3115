//! Event rows read from the events subsystem and the list filter used by
//! the cached event list.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EventId;

/// Largest page size accepted by the event list.
pub const MAX_PER_PAGE: u32 = 100;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Lifecycle status of an event, stored as lower-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Being prepared by the organizer, not visible to athletes.
    Draft,
    /// Open for discovery and registration.
    Published,
    /// Called off by the organizer.
    Cancelled,
    /// Already took place; results may be published.
    Finished,
}

impl EventStatus {
    /// Returns the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
            Self::Finished => "finished",
        }
    }

    /// Only published events take part in the popularity ranking.
    #[must_use]
    pub const fn is_rankable(self) -> bool {
        matches!(self, Self::Published)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "finished" => Ok(Self::Finished),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

/// The subset of an event row the ranking engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier.
    pub id: EventId,
    /// Display title.
    pub title: String,
    /// City the event takes place in, if known.
    pub city: Option<String>,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Scheduled calendar date, if already set.
    pub event_date: Option<NaiveDate>,
    /// Scheduled start time of day, if known.
    pub event_time: Option<NaiveTime>,
    /// When the organizer created the event.
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Effective start instant: the event date combined with its time of
    /// day (midnight when the time is unknown), read as UTC.
    #[must_use]
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        let date = self.event_date?;
        let time = self.event_time.unwrap_or(NaiveTime::MIN);
        Some(NaiveDateTime::new(date, time).and_utc())
    }
}

/// Event list row served by the cached list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventSummary {
    /// Event identifier.
    pub id: EventId,
    /// Display title.
    pub title: String,
    /// City, if known.
    pub city: Option<String>,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Scheduled date.
    pub event_date: Option<NaiveDate>,
    /// Scheduled start time.
    pub event_time: Option<NaiveTime>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Popularity score from the latest ranking pass.
    pub score: Option<f64>,
    /// Rank position from the latest ranking pass.
    pub rank_position: Option<u32>,
}

/// Sort order of the event list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventSort {
    /// Soonest first; undated events last.
    #[default]
    Date,
    /// Highest score first; unranked events last.
    Popularity,
    /// Most recently created first.
    Newest,
}

/// Filter set of the event list. Its serialized form is the cache key, so
/// it is normalized before use (see [`EventListFilter::normalized`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventListFilter {
    /// Only events in this status.
    pub status: Option<EventStatus>,
    /// Only events in this city (case-insensitive).
    pub city: Option<String>,
    /// Only events on or after this date.
    pub date_from: Option<NaiveDate>,
    /// Only events on or before this date.
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
    /// Sort order.
    pub sort: EventSort,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
}

impl Default for EventListFilter {
    fn default() -> Self {
        Self {
            status: None,
            city: None,
            date_from: None,
            date_to: None,
            search: None,
            sort: EventSort::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl EventListFilter {
    /// Returns the canonical form of this filter: trimmed text, lower-case
    /// city, blank strings dropped, `page >= 1`, `per_page` within
    /// `1..=MAX_PER_PAGE`. Semantically identical filters normalize equal.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            status: self.status,
            city: non_blank(self.city.as_deref()).map(|c| c.to_lowercase()),
            date_from: self.date_from,
            date_to: self.date_to,
            search: non_blank(self.search.as_deref()).map(str::to_string),
            sort: self.sort,
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Number of rows to skip for the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Returns `true` when `event` satisfies every predicate of the filter
    /// (pagination aside). Used by the in-memory repository.
    #[must_use]
    pub fn matches(&self, event: &EventRecord) -> bool {
        if self.status.is_some_and(|s| s != event.status) {
            return false;
        }
        if let Some(city) = &self.city {
            let same_city = event
                .city
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == city.to_lowercase());
            if !same_city {
                return false;
            }
        }
        if let Some(from) = self.date_from
            && !event.event_date.is_some_and(|d| d >= from)
        {
            return false;
        }
        if let Some(to) = self.date_to
            && !event.event_date.is_some_and(|d| d <= to)
        {
            return false;
        }
        if let Some(search) = &self.search
            && !event.title.to_lowercase().contains(&search.to_lowercase())
        {
            return false;
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
