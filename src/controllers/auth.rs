use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::middleware::{BearerToken, MaybeAuthUser};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/signout", post(sign_out))
}

// GET /api/auth/me, для анонима null
async fn me(MaybeAuthUser(user): MaybeAuthUser) -> Json<Option<AuthUser>> {
    Json(user)
}

// POST /api/auth/signout
async fn sign_out(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> AppResult<StatusCode> {
    state.auth.sign_out(&token).await.map_err(|e| {
        tracing::debug!("Sign-out rejected: {}", e);
        AppError::Unauthorized
    })?;
    Ok(StatusCode::NO_CONTENT)
}
