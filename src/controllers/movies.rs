use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::booking::{group_by_theater, GroupedShowtimes};
use crate::error::{AppError, AppResult};
use crate::models::{Movie, Theater};
use crate::services::availability;
use crate::store::{AvailabilityReport, BookingStore};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/{id}", get(get_movie))
        .route("/movies/{id}/showtimes", get(list_showtimes))
        .route("/movies/availability/refresh", post(refresh_availability))
        .route("/theaters", get(list_theaters))
}

// GET /api/movies
async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.cache.get_available_movies().await?))
}

// GET /api/movies/{id}
async fn get_movie(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> AppResult<Json<Movie>> {
    state
        .db
        .get_movie(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("movie {}", id)))
}

#[derive(Debug, Deserialize)]
struct ShowtimesQuery {
    date: Option<NaiveDate>,
}

// GET /api/movies/{id}/showtimes?date=YYYY-MM-DD
async fn list_showtimes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ShowtimesQuery>,
) -> AppResult<Json<GroupedShowtimes>> {
    let rows = state.cache.get_showtimes(id, query.date).await?;
    Ok(Json(group_by_theater(rows)))
}

// POST /api/movies/availability/refresh
async fn refresh_availability(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<AvailabilityReport>> {
    tracing::info!("Availability refresh requested by {}", user.user_id);
    let report = availability::refresh_once(
        &state.db,
        Some(&state.cache),
        super::today(),
        state.config.availability.archive_after_days,
    )
    .await?;
    Ok(Json(report))
}

// GET /api/theaters
async fn list_theaters(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Theater>>> {
    Ok(Json(state.db.list_theaters().await?))
}
