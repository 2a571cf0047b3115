//! Highlight handlers: the top-N most popular events.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{HighlightListResponse, HighlightsQuery};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RankingError};
use crate::service::clamp_limit;

/// `GET /highlights` — Top events by popularity.
///
/// # Errors
///
/// Returns [`RankingError::DataSource`] when the ranking table cannot be
/// read on a cache miss.
#[utoipa::path(
    get,
    path = "/api/v1/highlights",
    tag = "Highlights",
    summary = "Top events by popularity",
    description = "Returns up to `limit` ranked events ordered by rank position. Limits outside `[1, max]` are clamped. Served from cache for up to the highlights TTL.",
    params(HighlightsQuery),
    responses(
        (status = 200, description = "Ranked events, best first", body = HighlightListResponse),
        (status = 503, description = "Data source unavailable", body = ErrorResponse),
    )
)]
pub async fn get_highlights(
    State(state): State<AppState>,
    Query(query): Query<HighlightsQuery>,
) -> Result<impl IntoResponse, RankingError> {
    let service = &state.read_service;
    let limit = clamp_limit(query.limit, service.max_highlights());
    let data = service.get_highlight_events(Some(i64::from(limit))).await?;
    Ok(Json(HighlightListResponse { limit, data }))
}

/// Highlight routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/highlights", get(get_highlights))
}
