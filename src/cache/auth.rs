use crate::cache::CacheService;
use redis::AsyncCommands;

fn revoked_key(fingerprint: &str) -> String {
    format!("auth:revoked:{}", fingerprint)
}

impl CacheService {
    /// Помечает токен отозванным на `ttl_seconds` (до его `exp`).
    pub async fn revoke_token(&self, fingerprint: &str, ttl_seconds: u64) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.set_ex(revoked_key(fingerprint), 1, ttl_seconds).await
    }

    pub async fn is_token_revoked(&self, fingerprint: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.exists(revoked_key(fingerprint)).await
    }
}
