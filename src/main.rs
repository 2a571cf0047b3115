//! event-ranking server entry point.
//!
//! Loads configuration, connects the repository, starts the ranking
//! scheduler and serves the REST API until Ctrl+C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use event_ranking::api;
use event_ranking::app_state::AppState;
use event_ranking::cache::CacheLayer;
use event_ranking::config::{LogFormat, ServiceConfig};
use event_ranking::domain::SystemClock;
use event_ranking::persistence::{
    EventRepository, InMemoryEventRepository, PostgresEventRepository,
};
use event_ranking::scheduler::RankingScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting event-ranking");

    // Build persistence layer
    let repository = connect_repository(&config).await?;

    // Build application state
    let cache = CacheLayer::in_memory(config.cache_max_entries);
    let state = AppState::build(repository, cache, Arc::new(SystemClock), &config);

    // Start the ranking scheduler
    let scheduler = RankingScheduler::start(
        Arc::clone(&state.ranking_job),
        config.ranking_interval(),
        config.ranking_run_on_start,
    );

    // Start server
    let app = api::build_app(state, config.request_timeout());
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    tracing::info!("server shut down");
    Ok(())
}

async fn connect_repository(config: &ServiceConfig) -> anyhow::Result<Arc<dyn EventRepository>> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled; using the in-memory event repository");
        return Ok(Arc::new(InMemoryEventRepository::new()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    let repository = PostgresEventRepository::new(pool);
    repository.migrate().await?;
    tracing::info!("connected to PostgreSQL, migrations applied");
    Ok(Arc::new(repository))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("received SIGTERM, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
