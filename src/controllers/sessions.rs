use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthClient;
use crate::booking::sessions::SharedWizard;
use crate::booking::wizard::settle_payment;
use crate::booking::{group_by_theater, Flow, WizardSessions, WizardView};
use crate::cache::CacheService;
use crate::error::{AppError, AppResult, BookingError};
use crate::middleware::MaybeAuthUser;
use crate::models::{Booking, PaymentDetails, SeatId};
use crate::services::payment::MockPaymentProcessor;
use crate::store::BookingStore;

use super::today;

/// Состояние маршрутов мастера бронирования.
///
/// Без кеша сеансы читаются прямо из хранилища.
pub struct SessionsState<S> {
    pub store: S,
    pub cache: Option<CacheService>,
    pub auth: AuthClient,
    pub sessions: WizardSessions,
    pub payments: MockPaymentProcessor,
}

impl<S> FromRef<Arc<SessionsState<S>>> for AuthClient {
    fn from_ref(state: &Arc<SessionsState<S>>) -> Self {
        state.auth.clone()
    }
}

pub fn routes<S: BookingStore + 'static>() -> Router<Arc<SessionsState<S>>> {
    Router::new()
        .route("/booking-sessions", post(open_session::<S>))
        .route("/booking-sessions/{id}", get(get_session::<S>).delete(close_session::<S>))
        .route("/booking-sessions/{id}/reset", post(reset_session::<S>))
        .route("/booking-sessions/{id}/date", put(select_date::<S>))
        .route("/booking-sessions/{id}/showtime", put(select_showtime::<S>))
        .route("/booking-sessions/{id}/time", put(select_time::<S>))
        .route("/booking-sessions/{id}/seat-count", put(set_seat_count::<S>))
        .route("/booking-sessions/{id}/seats/{seat}", post(toggle_seat::<S>))
        .route("/booking-sessions/{id}/back", post(go_back::<S>))
        .route("/booking-sessions/{id}/confirm", post(confirm::<S>))
        .route("/booking-sessions/{id}/pay", post(pay::<S>))
}

/* ---------- helpers ---------- */

fn session<S>(state: &SessionsState<S>, id: Uuid) -> AppResult<SharedWizard> {
    state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("booking session {}", id)))
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    session_id: Uuid,
    wizard: WizardView,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    session_id: Uuid,
    booking: Booking,
    wizard: WizardView,
}

/* ---------- SESSIONS ---------- */

#[derive(Debug, Deserialize)]
struct OpenSessionRequest {
    movie_id: Uuid,
    #[serde(default = "default_flow")]
    flow: Flow,
}

fn default_flow() -> Flow {
    Flow::Theaters
}

// POST /api/booking-sessions
async fn open_session<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Json(req): Json<OpenSessionRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let movie = state
        .store
        .get_movie(req.movie_id)
        .await?
        .filter(|m| m.is_available)
        .ok_or_else(|| AppError::NotFound(format!("movie {}", req.movie_id)))?;

    let (session_id, wizard) = state.sessions.open(movie, req.flow, today());
    let view = wizard.lock().await.view();
    tracing::info!("Booking session {} opened for movie {}", session_id, req.movie_id);
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id, wizard: view })))
}

// GET /api/booking-sessions/{id}
async fn get_session<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let wizard = session(&state, id)?;
    let view = wizard.lock().await.view();
    Ok(Json(SessionResponse { session_id: id, wizard: view }))
}

// DELETE /api/booking-sessions/{id}
async fn close_session<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.sessions.close(&id, today()).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("booking session {}", id)))
    }
}

// POST /api/booking-sessions/{id}/reset
async fn reset_session<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let wizard = session(&state, id)?;
    let mut w = wizard.lock().await;
    w.reset(today());
    Ok(Json(SessionResponse { session_id: id, wizard: w.view() }))
}

/* ---------- DETAILS ---------- */

#[derive(Debug, Deserialize)]
struct DateRequest {
    date: NaiveDate,
}

// PUT /api/booking-sessions/{id}/date
async fn select_date<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DateRequest>,
) -> AppResult<Json<SessionResponse>> {
    let wizard = session(&state, id)?;
    let mut w = wizard.lock().await;
    w.select_date(req.date)?;
    Ok(Json(SessionResponse { session_id: id, wizard: w.view() }))
}

#[derive(Debug, Deserialize)]
struct ShowtimeRequest {
    showtime_id: Uuid,
}

// PUT /api/booking-sessions/{id}/showtime
// Сеанс ищется среди сеансов фильма на выбранную дату.
async fn select_showtime<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ShowtimeRequest>,
) -> AppResult<Json<SessionResponse>> {
    let wizard = session(&state, id)?;
    let mut w = wizard.lock().await;

    let (movie_id, date) = (w.movie().id, Some(w.booking_date()));
    let rows = match &state.cache {
        Some(cache) => cache.get_showtimes(movie_id, date).await?,
        None => state.store.list_showtimes_for_movie(movie_id, date).await?,
    };
    let grouped = group_by_theater(rows);
    let (showtime, theater) = grouped
        .find_showtime(&req.showtime_id)
        .ok_or_else(|| BookingError::UnknownShowtime(req.showtime_id.to_string()))?;

    w.select_showtime(showtime, theater)?;
    Ok(Json(SessionResponse { session_id: id, wizard: w.view() }))
}

#[derive(Debug, Deserialize)]
struct TimeRequest {
    time: String,
}

// PUT /api/booking-sessions/{id}/time
async fn select_time<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<TimeRequest>,
) -> AppResult<Json<SessionResponse>> {
    let wizard = session(&state, id)?;
    let mut w = wizard.lock().await;
    w.select_time(&req.time)?;
    Ok(Json(SessionResponse { session_id: id, wizard: w.view() }))
}

#[derive(Debug, Deserialize)]
struct SeatCountRequest {
    count: i64,
}

// PUT /api/booking-sessions/{id}/seat-count
async fn set_seat_count<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SeatCountRequest>,
) -> AppResult<Json<SessionResponse>> {
    let wizard = session(&state, id)?;
    let mut w = wizard.lock().await;
    w.set_seat_count(req.count)?;
    Ok(Json(SessionResponse { session_id: id, wizard: w.view() }))
}

// POST /api/booking-sessions/{id}/seats/{seat}
async fn toggle_seat<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path((id, seat)): Path<(Uuid, String)>,
) -> AppResult<Json<SessionResponse>> {
    let seat = seat.parse::<SeatId>().map_err(|e| AppError::BadRequest(e.to_string()))?;
    let wizard = session(&state, id)?;
    let mut w = wizard.lock().await;
    w.toggle_seat(seat)?;
    Ok(Json(SessionResponse { session_id: id, wizard: w.view() }))
}

// POST /api/booking-sessions/{id}/back
async fn go_back<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let wizard = session(&state, id)?;
    let mut w = wizard.lock().await;
    w.back()?;
    Ok(Json(SessionResponse { session_id: id, wizard: w.view() }))
}

/* ---------- CONFIRM & PAY ---------- */

// POST /api/booking-sessions/{id}/confirm
async fn confirm<S: BookingStore>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let wizard = session(&state, id)?;
    let mut w = wizard.lock().await;
    let booking = w.confirm(user.as_ref(), &state.store).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse { session_id: id, booking, wizard: w.view() }),
    ))
}

// POST /api/booking-sessions/{id}/pay
// Во время задержки замок мастера отпущен, чтобы DELETE мог отменить оплату.
// Оплата доводится в отдельной задаче: обрыв соединения её не прерывает.
async fn pay<S: BookingStore + 'static>(
    State(state): State<Arc<SessionsState<S>>>,
    Path(id): Path<Uuid>,
    Json(details): Json<PaymentDetails>,
) -> AppResult<Json<BookingResponse>> {
    let wizard = session(&state, id)?;
    let ticket = wizard.lock().await.begin_payment(&details)?;

    let task = tokio::spawn({
        let state = state.clone();
        let wizard = wizard.clone();
        async move {
            let outcome = settle_payment(&ticket, &state.store, &state.payments).await;
            let mut w = wizard.lock().await;
            let booking = w.finish_payment(ticket, outcome)?;
            Ok::<_, BookingError>((booking, w.view()))
        }
    });

    let (booking, view) = task
        .await
        .map_err(|e| AppError::Internal(format!("payment task failed: {}", e)))??;
    Ok(Json(BookingResponse { session_id: id, booking, wizard: view }))
}
