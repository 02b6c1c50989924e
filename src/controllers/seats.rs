use axum::{
    extract::Path,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::booking::SeatMap;
use crate::models::Seat;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/showtimes/{id}/seats", get(get_seat_map))
}

#[derive(Debug, Serialize)]
struct SeatMapResponse {
    showtime_id: Uuid,
    available_count: usize,
    rows: Vec<Vec<Seat>>,
}

// GET /api/showtimes/{id}/seats
// Занятость вычисляется из id сеанса, в БД не хранится.
async fn get_seat_map(Path(id): Path<Uuid>) -> Json<SeatMapResponse> {
    let map = SeatMap::for_showtime(&id.to_string());
    Json(SeatMapResponse {
        showtime_id: id,
        available_count: map.available_count(),
        rows: map.rows(),
    })
}
