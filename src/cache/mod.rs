//! Redis-кеш: read-through для каталога фильмов и сеансов, отзыв токенов.
//!
//! Redis не обязателен для корректности: при любой ошибке кеша данные берутся
//! из PostgreSQL напрямую.

use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::{database::Database, redis_client::RedisClient};

pub mod auth;
pub mod movies;
pub mod showtimes;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database) -> Self {
        Self { redis, db }
    }

    // Прогрев кеша при старте
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");
        match self.get_available_movies().await {
            Ok(movies) => info!("Loaded {} movies", movies.len()),
            Err(e) => debug!("Movie warmup skipped: {}", e),
        }
        info!("Cache warmup done");
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = match conn.get(key).await {
            Ok(data) => data,
            Err(e) => {
                debug!("Cache read {} failed: {:?}", key, e);
                return None;
            }
        };
        data.and_then(|d| serde_json::from_str(&d).ok())
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let Ok(data) = serde_json::to_string(value) else {
            return;
        };
        let mut conn = self.redis.conn.clone();
        let result: Result<(), redis::RedisError> = conn.set_ex(key, data, ttl_seconds).await;
        if let Err(e) = result {
            debug!("Cache write {} failed: {:?}", key, e);
        }
    }

    async fn delete(&self, key: &str) {
        let mut conn = self.redis.conn.clone();
        let result: Result<(), redis::RedisError> = conn.del(key).await;
        if let Err(e) = result {
            debug!("Cache delete {} failed: {:?}", key, e);
        }
    }
}
