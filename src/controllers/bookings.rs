use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::BookingWithMovie;
use crate::store::BookingStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/bookings", get(get_user_bookings))
}

// GET /api/bookings
// История бронирований текущего пользователя, новые сверху.
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Vec<BookingWithMovie>>> {
    let bookings = state.db.list_bookings_for_user(user.user_id).await?;
    tracing::debug!("User {} has {} bookings", user.user_id, bookings.len());
    Ok(Json(bookings))
}
