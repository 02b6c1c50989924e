use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::convert::Infallible;

use crate::auth::{AuthClient, AuthUser};
use crate::error::AppError;

/// Токен из заголовка `Authorization: Bearer ...`.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Bearer token of the request; used by sign-out, which needs the raw token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(parts)
            .map(|t| BearerToken(t.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

// Обязательная авторизация: 401, если токена нет или он недействителен
impl<S> FromRequestParts<S> for AuthUser
where
    AuthClient: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let auth = AuthClient::from_ref(state);
        auth.current_user(token).await.ok_or(AppError::Unauthorized)
    }
}

/// Необязательная авторизация: `None` вместо 401.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    AuthClient: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = match bearer_token(parts) {
            Some(token) => AuthClient::from_ref(state).current_user(token).await,
            None => None,
        };
        Ok(MaybeAuthUser(user))
    }
}
