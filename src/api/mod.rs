//! REST API layer: route handlers, DTOs, router composition and the
//! OpenAPI document.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` sits at the
//! root. With the `swagger-ui` feature the interactive docs are served at
//! `/swagger-ui` and the raw document at `/api-docs/openapi.json`.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "event-ranking",
        description = "Popularity ranking and cached read API for event discovery"
    ),
    paths(
        handlers::system::health_handler,
        handlers::highlights::get_highlights,
        handlers::events::list_events,
        handlers::events::get_event_ranking,
        handlers::events::invalidate_event_cache,
        handlers::admin::invalidate_pattern,
        handlers::admin::cache_stats,
        handlers::admin::recalculate_rankings,
        handlers::admin::ranking_status,
    ),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Highlights", description = "Top events by popularity"),
        (name = "Events", description = "Event lists and ranking detail"),
        (name = "Admin", description = "Cache and ranking job administration"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the servable application: routes, docs, the tracing, CORS and
/// timeout layers, and the shared state.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let router = build_router();

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
