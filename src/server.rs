//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, actor and worker spawning, and
//! the Axum server lifecycle including graceful shutdown.

use crate::application::click_worker::run_click_worker;
use crate::application::services::{
    ClickDispatcher, EvaluationService, ResolutionService, ResolverConfig,
};
use crate::config::Config;
use crate::domain::actors::{ClickTracker, EvalScheduler};
use crate::domain::queue::ClickQueue;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::actors::{ActorClickTracker, ActorEvalScheduler};
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::PgLinkRepository;
use crate::infrastructure::queue::ChannelQueue;
use crate::infrastructure::workflow::TracingWorkflow;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use axum::http::HeaderName;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long shutdown waits for background dispatches and the queue consumer.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Connects to Redis when configured, falling back to [`NullCache`].
pub async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            Arc::new(NullCache::new())
        }
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Redis cache (or NullCache fallback)
/// - Click tracker and evaluation scheduler actors
/// - Background click queue consumer
/// - Axum HTTP server
///
/// On SIGINT/SIGTERM the server stops accepting connections, waits for
/// in-flight click dispatches, closes the click queue and lets the consumer
/// drain it.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_connect_timeout())
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = connect_cache(&config).await;

    let link_repository: Arc<dyn LinkRepository> =
        Arc::new(PgLinkRepository::new(Arc::new(pool)));

    let resolution_service = Arc::new(ResolutionService::new(
        link_repository.clone(),
        cache.clone(),
        ResolverConfig {
            cache_ttl: config.cache_ttl(),
        },
    ));

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);
    let click_queue = Arc::new(ChannelQueue::new(click_tx));

    let click_tracker: Arc<dyn ClickTracker> = Arc::new(ActorClickTracker::new(
        config.actor_mailbox_capacity,
        config.click_history_limit,
        config.actor_idle_timeout(),
    ));
    let eval_scheduler: Arc<dyn EvalScheduler> = Arc::new(ActorEvalScheduler::new(
        config.actor_mailbox_capacity,
        config.evaluation_delay(),
        Arc::new(TracingWorkflow),
    ));

    let worker = tokio::spawn(run_click_worker(
        click_rx,
        Arc::new(EvaluationService::new(eval_scheduler)),
        config.click_worker_concurrency,
    ));

    let click_dispatcher = Arc::new(ClickDispatcher::new(
        click_queue.clone() as Arc<dyn ClickQueue>,
        click_tracker,
        config.dispatch_max_in_flight,
    ));

    let country_header = HeaderName::from_bytes(config.country_header.as_bytes())
        .context("Invalid COUNTRY_HEADER")?;

    let state = AppState {
        resolution_service,
        click_dispatcher: click_dispatcher.clone(),
        link_repository,
        cache,
        click_queue,
        country_header,
    };

    let app = app_router(state, config.rate_limit())?;

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped, draining click dispatches");

    if !click_dispatcher.drain(SHUTDOWN_GRACE).await {
        tracing::warn!("Click dispatches still running after {:?}", SHUTDOWN_GRACE);
    }

    // Last sender handle; the consumer exits once the channel is closed and empty.
    drop(click_dispatcher);

    match tokio::time::timeout(SHUTDOWN_GRACE, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Click worker panicked: {}", e),
        Err(_) => tracing::warn!("Click worker did not finish within {:?}", SHUTDOWN_GRACE),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
