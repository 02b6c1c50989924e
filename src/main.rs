use axum::{extract::State, http::StatusCode, routing::get, Router};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{config::Config, controllers, services::availability, AppState};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&config.app.rust_log));
    if config.app.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting cinema booking API ({})", config.app.environment);

    let app_state = AppState::new(config.clone()).await?;
    info!("Database and Redis connected");

    let warmup_state = app_state.clone();
    tokio::spawn(async move {
        warmup_state.cache.warmup_cache().await;
    });

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let refresher = if config.availability.enabled {
        Some(tokio::spawn(availability::run(
            app_state.db.clone(),
            Some(app_state.cache.clone()),
            config.availability.clone(),
            cancel.clone(),
        )))
    } else {
        info!("Availability refresh disabled");
        None
    };

    // --- Web server ---
    let app = Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes(&app_state))
        .with_state(app_state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Some(handle) = refresher {
        if let Err(e) = handle.await {
            warn!("Availability task ended abnormally: {:?}", e);
        }
    }
    info!("Server stopped");
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match (state.db.ping().await, state.redis.ping().await) {
        (Ok(()), Ok(())) => (StatusCode::OK, "OK"),
        (db, redis) => {
            warn!("Health check failed: db={:?} redis={:?}", db.err(), redis.err());
            (StatusCode::SERVICE_UNAVAILABLE, "DEGRADED")
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {:?}", e);
    }
    info!("Shutdown signal received");
}
