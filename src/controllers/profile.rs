use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{ProfileUpdate, ProfileWithPreferences};
use crate::store::{BookingStore, StoreError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

// GET /api/profile
async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ProfileWithPreferences>> {
    Ok(Json(state.db.get_profile(user.user_id).await?))
}

// PUT /api/profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<ProfileWithPreferences>> {
    update.validate().map_err(StoreError::from)?;
    Ok(Json(state.db.update_profile(user.user_id, update).await?))
}
