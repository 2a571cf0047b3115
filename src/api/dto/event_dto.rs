//! Event list DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, default_page, default_per_page};
use crate::domain::{EventListFilter, EventSort, EventStatus, EventSummary};
use crate::error::RankingError;

/// Query parameters of `GET /events`.
///
/// `status` and `sort` arrive as text and are validated here, so a bad
/// value yields the structured error body rather than a bare rejection.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventListQuery {
    /// `draft`, `published`, `cancelled` or `finished`.
    pub status: Option<String>,
    /// City, case-insensitive.
    pub city: Option<String>,
    /// Earliest event date, `YYYY-MM-DD`.
    pub date_from: Option<NaiveDate>,
    /// Latest event date, `YYYY-MM-DD`.
    pub date_to: Option<NaiveDate>,
    /// Substring of the title, case-insensitive.
    pub search: Option<String>,
    /// `date` (default), `popularity` or `newest`.
    pub sort: Option<String>,
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl EventListQuery {
    /// Converts the query into a list filter.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::InvalidRequest`] for an unknown status or
    /// sort order.
    pub fn into_filter(self) -> Result<EventListFilter, RankingError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<EventStatus>)
            .transpose()
            .map_err(RankingError::InvalidRequest)?;
        let sort = match self.sort.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
            None => EventSort::Date,
            Some(s) => match s.as_str() {
                "" | "date" => EventSort::Date,
                "popularity" | "popular" => EventSort::Popularity,
                "newest" => EventSort::Newest,
                other => {
                    return Err(RankingError::InvalidRequest(format!(
                        "unknown sort order: {other}"
                    )));
                }
            },
        };
        Ok(EventListFilter {
            status,
            city: self.city,
            date_from: self.date_from,
            date_to: self.date_to,
            search: self.search,
            sort,
            page: self.page,
            per_page: self.per_page,
        })
    }
}

/// Response body of `GET /events`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventListResponse {
    /// Events on the page.
    pub data: Vec<EventSummary>,
    /// Page metadata.
    pub pagination: PaginationMeta,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn query() -> EventListQuery {
        EventListQuery {
            status: None,
            city: None,
            date_from: None,
            date_to: None,
            search: None,
            sort: None,
            page: default_page(),
            per_page: default_per_page(),
        }
    }

    #[test]
    fn defaults_map_to_default_filter() {
        let Ok(filter) = query().into_filter() else {
            panic!("default query should convert");
        };
        assert_eq!(filter, EventListFilter::default());
    }

    #[test]
    fn status_and_sort_are_parsed() {
        let q = EventListQuery {
            status: Some("Published".to_string()),
            sort: Some("popularity".to_string()),
            ..query()
        };
        let Ok(filter) = q.into_filter() else {
            panic!("query should convert");
        };
        assert_eq!(filter.status, Some(EventStatus::Published));
        assert_eq!(filter.sort, EventSort::Popularity);
    }

    #[test]
    fn unknown_values_are_invalid_requests() {
        let bad_status = EventListQuery {
            status: Some("archived".to_string()),
            ..query()
        };
        assert!(matches!(
            bad_status.into_filter(),
            Err(RankingError::InvalidRequest(_))
        ));

        let bad_sort = EventListQuery {
            sort: Some("alphabetical".to_string()),
            ..query()
        };
        assert!(matches!(
            bad_sort.into_filter(),
            Err(RankingError::InvalidRequest(_))
        ));
    }
}
