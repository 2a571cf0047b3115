//! Event handlers: filtered list, ranking detail and per-event cache
//! invalidation.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::api::dto::{EventListQuery, EventListResponse, InvalidationResponse, PaginationMeta};
use crate::app_state::AppState;
use crate::domain::{EventId, RankedEvent};
use crate::error::{ErrorResponse, RankingError};

/// `GET /events` — Filtered, paginated event list.
///
/// # Errors
///
/// Returns [`RankingError::InvalidRequest`] for an unknown status or sort
/// order or an inverted date range, and [`RankingError::DataSource`] when
/// the store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    description = "Returns one page of events matching the filters, each with its latest score and rank when ranked. Equivalent filters share one cache entry.",
    params(EventListQuery),
    responses(
        (status = 200, description = "Event page", body = EventListResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 503, description = "Data source unavailable", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, RankingError> {
    let filter = query.into_filter()?;
    let page = state.read_service.list_events(&filter).await?;
    Ok(Json(EventListResponse {
        pagination: PaginationMeta {
            page: page.page,
            per_page: page.per_page,
            count: page.events.len(),
        },
        data: page.events,
    }))
}

/// `GET /events/{id}/ranking` — Ranking detail of one event.
///
/// # Errors
///
/// Returns [`RankingError::EventNotFound`] when the event is not ranked.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/ranking",
    tag = "Events",
    summary = "Get event ranking",
    description = "Returns the score, engagement counters, time-to-event and rank position computed by the latest ranking pass.",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    responses(
        (status = 200, description = "Ranking detail", body = RankedEvent),
        (status = 404, description = "Event not ranked", body = ErrorResponse),
    )
)]
pub async fn get_event_ranking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, RankingError> {
    let ranking = state
        .read_service
        .get_event_ranking(EventId::new(id))
        .await?;
    Ok(Json(ranking))
}

/// `DELETE /events/{id}/cache` — Drop cached reads affected by an event.
///
/// Called by the event write paths after their change is committed.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}/cache",
    tag = "Events",
    summary = "Invalidate event cache",
    description = "Drops the event's detail and ranking entries plus every cached event list and highlight list.",
    params(
        ("id" = i64, Path, description = "Event id"),
    ),
    responses(
        (status = 200, description = "Entries removed", body = InvalidationResponse),
    )
)]
pub async fn invalidate_event_cache(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let event_id = EventId::new(id);
    let removed = state.read_service.invalidate_event_cache(event_id).await;
    tracing::info!(%event_id, removed, "event cache invalidated");
    Json(InvalidationResponse {
        target: format!("event:{event_id}"),
        removed,
    })
}

/// Event routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}/ranking", get(get_event_ranking))
        .route("/events/{id}/cache", delete(invalidate_event_cache))
}
