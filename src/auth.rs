//! Внешний провайдер аутентификации.
//!
//! Сервис сам пользователей не хранит: он проверяет JWT, выданный провайдером
//! (HS256, общий секрет), и при выходе уведомляет провайдера. Отозванные
//! токены помечаются в Redis до истечения срока действия.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::config::AuthConfig;

/// Аутентифицированный пользователь.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token subject is not a user id")]
    InvalidSubject,

    #[error("auth provider request failed: {0}")]
    Provider(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct AuthClient {
    decoding_key: DecodingKey,
    validation: Validation,
    http_client: reqwest::Client,
    auth_url: String,
    api_key: Option<String>,
    cache: Option<CacheService>,
}

impl AuthClient {
    pub fn from_config(config: &AuthConfig, cache: Option<CacheService>) -> Result<Self, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // провайдер ставит aud = "authenticated", нам он не важен
        validation.validate_aud = false;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            http_client: reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            cache,
        })
    }

    /// Verifies signature and expiry.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.decode_claims(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;
        Ok(AuthUser { user_id, email: claims.email })
    }

    /// `None` for invalid, expired or revoked tokens.
    pub async fn current_user(&self, token: &str) -> Option<AuthUser> {
        let user = match self.verify(token) {
            Ok(user) => user,
            Err(e) => {
                debug!("Rejected bearer token: {}", e);
                return None;
            }
        };

        if let Some(cache) = &self.cache {
            match cache.is_token_revoked(&token_fingerprint(token)).await {
                Ok(true) => return None,
                Ok(false) => {}
                Err(e) => warn!("Revocation check failed, accepting token: {:?}", e),
            }
        }
        Some(user)
    }

    /// Best-effort provider logout, then local revocation until the token expires.
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.decode_claims(token)?;

        if let Err(e) = self.notify_provider_logout(token).await {
            warn!("Provider logout failed: {}", e);
        }

        if let Some(cache) = &self.cache {
            let ttl = (claims.exp - Utc::now().timestamp()).max(1) as u64;
            if let Err(e) = cache.revoke_token(&token_fingerprint(token), ttl).await {
                warn!("Failed to store token revocation: {:?}", e);
            }
        }
        info!("User {} signed out", claims.sub);
        Ok(())
    }

    pub async fn notify_provider_logout(&self, token: &str) -> Result<(), AuthError> {
        let mut request = self
            .http_client
            .post(format!("{}/logout", self.auth_url))
            .bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

/// SHA-256 токена в hex, сам токен в Redis не кладём.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
