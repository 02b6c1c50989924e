pub mod config;
pub mod database;
pub mod redis_client;
pub mod models;
pub mod booking;
pub mod store;
pub mod auth;
pub mod error;
pub mod controllers;
pub mod middleware;
pub mod cache;
pub mod services;

use std::sync::Arc;

use axum::extract::FromRef;

use booking::WizardSessions;
use controllers::sessions::SessionsState;
use services::payment::MockPaymentProcessor;

// Shared state для всего приложения
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub auth: auth::AuthClient,
    /// Мастера бронирования со своим состоянием маршрутов.
    pub sessions: Arc<SessionsState<database::Database>>,
}

impl FromRef<Arc<AppState>> for auth::AuthClient {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    /// Подключается к PostgreSQL и Redis, применяет миграции.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        let cache = cache::CacheService::new(redis.clone(), db.clone());
        let auth = auth::AuthClient::from_config(&config.auth, Some(cache.clone()))?;

        let sessions = Arc::new(SessionsState {
            store: db.clone(),
            cache: Some(cache.clone()),
            auth: auth.clone(),
            sessions: WizardSessions::with_default_price(config.booking.default_ticket_price),
            payments: MockPaymentProcessor::from_config(&config.booking),
        });

        Ok(Arc::new(Self {
            db,
            redis,
            cache,
            sessions,
            auth,
            config,
        }))
    }
}
