//! Administration handlers: cache invalidation and statistics, on-demand
//! ranking passes and job status.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{InvalidatePatternRequest, InvalidationResponse, RecalculateResponse};
use crate::app_state::AppState;
use crate::cache::CacheStats;
use crate::error::{ErrorResponse, RankingError};
use crate::service::RankingStatus;

/// `POST /cache/invalidate` — Drop every key with a prefix.
///
/// # Errors
///
/// Returns [`RankingError::InvalidRequest`] for a blank prefix.
#[utoipa::path(
    post,
    path = "/api/v1/cache/invalidate",
    tag = "Admin",
    summary = "Invalidate cache prefix",
    description = "Removes every cache entry whose key starts with `prefix`, e.g. `highlights` or `events:list`.",
    request_body = InvalidatePatternRequest,
    responses(
        (status = 200, description = "Entries removed", body = InvalidationResponse),
        (status = 400, description = "Blank prefix", body = ErrorResponse),
    )
)]
pub async fn invalidate_pattern(
    State(state): State<AppState>,
    Json(req): Json<InvalidatePatternRequest>,
) -> Result<impl IntoResponse, RankingError> {
    let removed = state.read_service.invalidate_pattern(&req.prefix).await?;
    tracing::info!(prefix = %req.prefix, removed, "cache prefix invalidated");
    Ok(Json(InvalidationResponse {
        target: req.prefix,
        removed,
    }))
}

/// `GET /cache/stats` — Cache counters.
#[utoipa::path(
    get,
    path = "/api/v1/cache/stats",
    tag = "Admin",
    summary = "Cache statistics",
    description = "Returns hit, miss, write, eviction and invalidation counters and the current entry count.",
    responses(
        (status = 200, description = "Cache counters", body = CacheStats),
    )
)]
pub async fn cache_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.read_service.cache_stats().await)
}

/// `POST /rankings/recalculate` — Run a ranking pass now.
///
/// # Errors
///
/// Returns [`RankingError::DataSource`] when the eligible events cannot be
/// listed.
#[utoipa::path(
    post,
    path = "/api/v1/rankings/recalculate",
    tag = "Admin",
    summary = "Recalculate rankings",
    description = "Runs one ranking pass and returns its report, or `skipped` when a pass is already running.",
    responses(
        (status = 200, description = "Pass outcome", body = RecalculateResponse),
        (status = 503, description = "Data source unavailable", body = ErrorResponse),
    )
)]
pub async fn recalculate_rankings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RankingError> {
    let outcome = state.ranking_job.recalculate_rankings().await?;
    Ok(Json(RecalculateResponse::from(outcome)))
}

/// `GET /rankings/status` — Ranking job progress.
#[utoipa::path(
    get,
    path = "/api/v1/rankings/status",
    tag = "Admin",
    summary = "Ranking job status",
    description = "Returns whether a pass is running, the number of completed passes and the last pass report.",
    responses(
        (status = 200, description = "Job status", body = RankingStatus),
    )
)]
pub async fn ranking_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ranking_job.status().await)
}

/// Admin routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cache/invalidate", post(invalidate_pattern))
        .route("/cache/stats", get(cache_stats))
        .route("/rankings/recalculate", post(recalculate_rankings))
        .route("/rankings/status", get(ranking_status))
}
