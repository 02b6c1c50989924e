//! wizard.rs
//!
//! Пошаговый мастер бронирования: выбор сеанса → детали (мест, количество) →
//! оплата → успех. Текущий пользователь передаётся явно, глобального состояния нет.

use std::sync::{Arc, Weak};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::booking::pricing::{self, MIN_SEATS};
use crate::booking::seating::{SeatMap, SeatSelection};
use crate::error::BookingError;
use crate::models::{Booking, Movie, NewBooking, PaymentDetails, PaymentStatus, SeatId, Showtime, Theater};
use crate::services::payment::MockPaymentProcessor;
use crate::store::BookingStore;

/// Fixed showtimes of the basic flow, which has no theater selection.
pub const BASIC_SHOWTIMES: [&str; 5] = ["10:00 AM", "1:30 PM", "4:00 PM", "7:30 PM", "10:00 PM"];

/// Сколько дней вперёд можно бронировать, включая сегодня.
pub const BOOKING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Theater and showtime picked from stored showtimes, seats picked on a grid.
    Theaters,
    /// One of [`BASIC_SHOWTIMES`], only a seat count.
    Basic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum WizardStep {
    Theaters,
    Details,
    Payment { booking_id: Uuid },
    Success { booking_id: Uuid },
}

impl WizardStep {
    pub fn name(&self) -> &'static str {
        match self {
            WizardStep::Theaters => "theaters",
            WizardStep::Details => "details",
            WizardStep::Payment { .. } => "payment",
            WizardStep::Success { .. } => "success",
        }
    }

    pub fn booking_id(&self) -> Option<Uuid> {
        match self {
            WizardStep::Payment { booking_id } | WizardStep::Success { booking_id } => Some(*booking_id),
            _ => None,
        }
    }
}

/// Выбранный сеанс. В базовом сценарии нет ни id, ни кинотеатра.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedShowtime {
    pub showtime_id: Option<Uuid>,
    pub theater: Option<Theater>,
    pub time: String,
    pub price_multiplier: f64,
}

/// Handle for one payment attempt.
///
/// Issued by [`BookingWizard::begin_payment`]; the wizard can cancel it
/// through the shared token, and a ticket from before a reset is stale.
/// Dropping every copy of the ticket abandons the attempt.
#[derive(Debug, Clone)]
pub struct PaymentTicket {
    pub booking_id: Uuid,
    pub amount: f64,
    pub method: &'static str,
    cancel: CancellationToken,
    generation: u64,
    _alive: Arc<()>,
}

impl PaymentTicket {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Оплата, выданная мастером; живая, пока жив хотя бы один её билет.
#[derive(Debug)]
struct InFlight {
    cancel: CancellationToken,
    ticket: Weak<()>,
}

impl InFlight {
    fn is_live(&self) -> bool {
        self.ticket.strong_count() > 0
    }
}

#[derive(Debug)]
pub struct BookingWizard {
    movie: Movie,
    flow: Flow,
    base_price: f64,
    today: NaiveDate,
    step: WizardStep,
    booking_date: NaiveDate,
    showtime: Option<SelectedShowtime>,
    seat_count: u8,
    seats: SeatSelection,
    seat_map: Option<SeatMap>,
    in_flight: Option<InFlight>,
    generation: u64,
}

/// Снимок состояния мастера для клиента.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub movie_id: Uuid,
    pub movie_title: String,
    pub flow: Flow,
    pub step: WizardStep,
    pub booking_date: NaiveDate,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub showtime: Option<SelectedShowtime>,
    pub available_times: Vec<String>,
    pub seat_count: u8,
    pub selected_seats: Vec<String>,
    pub ticket_price: f64,
    pub total_amount: f64,
    pub payment_in_progress: bool,
}

impl BookingWizard {
    pub fn new(movie: Movie, flow: Flow, today: NaiveDate) -> Self {
        let base_price = movie.base_price();
        Self {
            movie,
            flow,
            base_price,
            today,
            step: initial_step(flow),
            booking_date: today,
            showtime: None,
            seat_count: MIN_SEATS,
            seats: SeatSelection::new(),
            seat_map: None,
            in_flight: None,
            generation: 0,
        }
    }

    /// Цена билета для фильмов без своей цены.
    pub fn with_default_price(mut self, default_price: f64) -> Self {
        if !matches!(self.movie.price, Some(p) if p > 0.0) && default_price > 0.0 {
            self.base_price = default_price;
        }
        self
    }

    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn booking_date(&self) -> NaiveDate {
        self.booking_date
    }

    pub fn showtime(&self) -> Option<&SelectedShowtime> {
        self.showtime.as_ref()
    }

    pub fn seat_count(&self) -> u8 {
        self.seat_count
    }

    pub fn selected_seats(&self) -> &SeatSelection {
        &self.seats
    }

    pub fn seat_map(&self) -> Option<&SeatMap> {
        self.seat_map.as_ref()
    }

    pub fn payment_in_progress(&self) -> bool {
        self.in_flight.as_ref().is_some_and(InFlight::is_live)
    }

    pub fn first_date(&self) -> NaiveDate {
        self.today
    }

    pub fn last_date(&self) -> NaiveDate {
        self.today + Duration::days(BOOKING_WINDOW_DAYS - 1)
    }

    fn invalid(&self, action: &'static str) -> BookingError {
        BookingError::InvalidTransition { step: self.step.name(), action }
    }

    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), BookingError> {
        if !matches!(self.step, WizardStep::Theaters | WizardStep::Details) {
            return Err(self.invalid("select a date"));
        }
        if date < self.first_date() || date > self.last_date() {
            return Err(BookingError::DateOutOfRange);
        }

        self.booking_date = date;
        if self.flow == Flow::Theaters {
            // сеансы привязаны к дате
            self.showtime = None;
            self.seat_map = None;
            self.seats.clear();
            self.step = WizardStep::Theaters;
        }
        Ok(())
    }

    pub fn select_showtime(&mut self, showtime: &Showtime, theater: &Theater) -> Result<(), BookingError> {
        if self.flow != Flow::Theaters || self.step != WizardStep::Theaters {
            return Err(self.invalid("select a showtime"));
        }
        if showtime.movie_id != self.movie.id || showtime.theater_id != theater.id {
            return Err(BookingError::UnknownShowtime(showtime.id.to_string()));
        }

        debug!("Showtime {} at {} selected for movie {}", showtime.show_time, theater.name, self.movie.id);
        self.showtime = Some(SelectedShowtime {
            showtime_id: Some(showtime.id),
            theater: Some(theater.clone()),
            time: showtime.show_time.clone(),
            price_multiplier: showtime.multiplier(),
        });
        self.seat_map = Some(SeatMap::for_showtime(&showtime.id.to_string()));
        self.seats.clear();
        self.step = WizardStep::Details;
        Ok(())
    }

    pub fn select_time(&mut self, time: &str) -> Result<(), BookingError> {
        if self.flow != Flow::Basic || self.step != WizardStep::Details {
            return Err(self.invalid("select a time"));
        }
        let Some(time) = BASIC_SHOWTIMES.iter().find(|t| **t == time) else {
            return Err(BookingError::UnknownShowtime(time.to_string()));
        };

        self.showtime = Some(SelectedShowtime {
            showtime_id: None,
            theater: None,
            time: time.to_string(),
            price_multiplier: 1.0,
        });
        Ok(())
    }

    /// Clamps to 1..=10; seats picked beyond the new count are dropped.
    pub fn set_seat_count(&mut self, requested: i64) -> Result<u8, BookingError> {
        if !matches!(self.step, WizardStep::Theaters | WizardStep::Details) {
            return Err(self.invalid("change the seat count"));
        }
        self.seat_count = pricing::clamp_seat_count(requested);
        self.seats.truncate(usize::from(self.seat_count));
        Ok(self.seat_count)
    }

    pub fn toggle_seat(&mut self, seat: SeatId) -> Result<(), BookingError> {
        if self.step != WizardStep::Details {
            return Err(self.invalid("pick a seat"));
        }
        let Some(map) = self.seat_map.as_ref() else {
            return Err(BookingError::NoSeatGrid);
        };
        self.seats.toggle(seat, usize::from(self.seat_count), map)
    }

    pub fn back(&mut self) -> Result<(), BookingError> {
        if self.flow != Flow::Theaters || self.step != WizardStep::Details {
            return Err(self.invalid("go back"));
        }
        self.step = WizardStep::Theaters;
        Ok(())
    }

    /// Creates the `pending` booking and moves to payment.
    ///
    /// Nothing is written when the user is missing or no showtime is chosen.
    pub async fn confirm<S: BookingStore>(
        &mut self,
        user: Option<&AuthUser>,
        store: &S,
    ) -> Result<Booking, BookingError> {
        if self.step != WizardStep::Details {
            return Err(self.invalid("confirm"));
        }
        let user = user.ok_or(BookingError::AuthRequired)?;
        let showtime = self.showtime.as_ref().ok_or(BookingError::ShowtimeRequired)?;

        let new_booking = NewBooking {
            user_id: user.user_id,
            movie_id: self.movie.id,
            theater_id: showtime.theater.as_ref().map(|t| t.id),
            showtime_id: showtime.showtime_id,
            booking_date: self.booking_date,
            booking_time: showtime.time.clone(),
            seats: i32::from(self.seat_count),
            seat_numbers: self.seats.labels(),
            total_amount: self.total_amount(),
        };

        let booking = store.create_booking(new_booking).await.map_err(|e| {
            warn!("Booking for user {} failed: {}", user.user_id, e);
            BookingError::from(e)
        })?;

        info!(
            "Booking {} created for user {}: {} x {} = {:.2}",
            booking.id, user.user_id, booking.seats, self.movie.title, booking.total_amount
        );
        self.step = WizardStep::Payment { booking_id: booking.id };
        Ok(booking)
    }

    /// Checks the payment details and starts a payment attempt.
    ///
    /// Invalid details leave the wizard on the payment step. An attempt whose
    /// ticket was dropped without [`finish_payment`](Self::finish_payment)
    /// no longer blocks a new one.
    pub fn begin_payment(&mut self, details: &PaymentDetails) -> Result<PaymentTicket, BookingError> {
        let WizardStep::Payment { booking_id } = self.step else {
            return Err(self.invalid("pay"));
        };
        details
            .validate()
            .map_err(|e| BookingError::InvalidPaymentDetails(e.to_string()))?;

        if self.payment_in_progress() {
            return Err(BookingError::PaymentInProgress);
        }
        if self.in_flight.is_some() {
            warn!("Payment for booking {} was abandoned, starting over", booking_id);
            self.cancel_payment();
        }

        let cancel = CancellationToken::new();
        let alive = Arc::new(());
        self.generation += 1;
        self.in_flight = Some(InFlight { cancel: cancel.clone(), ticket: Arc::downgrade(&alive) });
        Ok(PaymentTicket {
            booking_id,
            amount: self.total_amount(),
            method: details.method(),
            cancel,
            generation: self.generation,
            _alive: alive,
        })
    }

    /// Applies the outcome of [`settle_payment`].
    ///
    /// A ticket issued before the last reset is rejected and does not touch
    /// the current state. On failure the wizard stays on the payment step.
    pub fn finish_payment(
        &mut self,
        ticket: PaymentTicket,
        outcome: Result<Booking, BookingError>,
    ) -> Result<Booking, BookingError> {
        if ticket.generation != self.generation || ticket.is_cancelled() {
            return Err(BookingError::PaymentCancelled);
        }
        self.in_flight = None;

        let booking = outcome?;
        info!("Booking {} paid", booking.id);
        self.step = WizardStep::Success { booking_id: ticket.booking_id };
        Ok(booking)
    }

    pub async fn pay<S: BookingStore>(
        &mut self,
        details: &PaymentDetails,
        store: &S,
        processor: &MockPaymentProcessor,
    ) -> Result<Booking, BookingError> {
        let ticket = self.begin_payment(details)?;
        let outcome = settle_payment(&ticket, store, processor).await;
        self.finish_payment(ticket, outcome)
    }

    /// Сброс к начальному состоянию; оплата в процессе отменяется.
    pub fn reset(&mut self, today: NaiveDate) {
        self.cancel_payment();
        self.generation += 1;
        self.today = today;
        self.step = initial_step(self.flow);
        self.booking_date = today;
        self.showtime = None;
        self.seat_count = MIN_SEATS;
        self.seats.clear();
        self.seat_map = None;
    }

    fn cancel_payment(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Cancelling in-flight payment");
            in_flight.cancel.cancel();
        }
    }

    pub fn total_amount(&self) -> f64 {
        let multiplier = self.showtime.as_ref().map(|s| s.price_multiplier);
        pricing::total_amount(self.base_price, multiplier, self.seat_count)
    }

    pub fn view(&self) -> WizardView {
        let available_times = match self.flow {
            Flow::Basic => BASIC_SHOWTIMES.iter().map(|t| t.to_string()).collect(),
            Flow::Theaters => Vec::new(),
        };
        WizardView {
            movie_id: self.movie.id,
            movie_title: self.movie.title.clone(),
            flow: self.flow,
            step: self.step,
            booking_date: self.booking_date,
            first_date: self.first_date(),
            last_date: self.last_date(),
            showtime: self.showtime.clone(),
            available_times,
            seat_count: self.seat_count,
            selected_seats: self.seats.labels(),
            ticket_price: self.base_price,
            total_amount: self.total_amount(),
            payment_in_progress: self.payment_in_progress(),
        }
    }
}

impl Drop for BookingWizard {
    fn drop(&mut self) {
        self.cancel_payment();
    }
}

fn initial_step(flow: Flow) -> WizardStep {
    match flow {
        Flow::Theaters => WizardStep::Theaters,
        Flow::Basic => WizardStep::Details,
    }
}

/// Runs the mock payment and marks the booking `paid`.
///
/// Does not need the wizard, so the caller can release its lock while the
/// delay runs. A cancelled ticket never reaches the store.
pub async fn settle_payment<S: BookingStore>(
    ticket: &PaymentTicket,
    store: &S,
    processor: &MockPaymentProcessor,
) -> Result<Booking, BookingError> {
    debug!("Paying booking {} by {}", ticket.booking_id, ticket.method);
    processor
        .authorize(ticket.amount, &ticket.cancel)
        .await
        .map_err(|_| BookingError::PaymentCancelled)?;

    if ticket.is_cancelled() {
        return Err(BookingError::PaymentCancelled);
    }

    store
        .update_booking_payment_status(ticket.booking_id, PaymentStatus::Paid)
        .await
        .map_err(|e| {
            warn!("Payment status update for booking {} failed: {}", ticket.booking_id, e);
            BookingError::from(e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardDetails, UpiDetails};
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;
    use std::time::Duration as StdDuration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn movie(price: Option<f64>) -> Movie {
        Movie {
            id: Uuid::new_v4(),
            title: "Premalu".to_string(),
            description: None,
            duration: Some("2h 36m".to_string()),
            language: Some("Malayalam".to_string()),
            genres: vec!["Romance".to_string()],
            price,
            rating: Some(8.1),
            poster_url: None,
            release_date: None,
            is_available: true,
            created_at: Utc::now(),
        }
    }

    fn theater() -> Theater {
        Theater {
            id: Uuid::new_v4(),
            name: "PVR Lulu".to_string(),
            location: "Edappally".to_string(),
            city: "Kochi".to_string(),
            address: None,
            amenities: vec![],
        }
    }

    fn showtime(movie: &Movie, theater: &Theater, multiplier: Option<f64>) -> Showtime {
        Showtime {
            id: Uuid::new_v4(),
            movie_id: movie.id,
            theater_id: theater.id,
            show_date: today(),
            show_time: "7:30 PM".to_string(),
            price_multiplier: multiplier,
            available_seats: Some(96),
            is_available: true,
        }
    }

    fn user() -> AuthUser {
        AuthUser { user_id: Uuid::new_v4(), email: Some("anu@example.com".to_string()) }
    }

    fn upi() -> PaymentDetails {
        PaymentDetails::Upi(UpiDetails { upi_id: "anu@okaxis".to_string() })
    }

    fn free_seats(map: &SeatMap, n: usize) -> Vec<SeatId> {
        map.rows().into_iter().flatten().filter(|s| s.is_available).map(|s| s.id).take(n).collect()
    }

    fn assert_defaults(w: &BookingWizard, flow: Flow) {
        assert_eq!(w.step(), initial_step(flow));
        assert_eq!(w.booking_date(), today());
        assert!(w.showtime().is_none());
        assert_eq!(w.seat_count(), 1);
        assert!(w.selected_seats().is_empty());
        assert!(!w.payment_in_progress());
    }

    /// Theaters flow up to the details step with a 1.2 showtime.
    fn at_details() -> (BookingWizard, Showtime) {
        let m = movie(Some(250.0));
        let t = theater();
        let s = showtime(&m, &t, Some(1.2));
        let mut w = BookingWizard::new(m, Flow::Theaters, today());
        w.select_showtime(&s, &t).unwrap();
        (w, s)
    }

    async fn at_payment(store: &InMemoryStore) -> BookingWizard {
        let (mut w, _) = at_details();
        w.set_seat_count(3).unwrap();
        w.confirm(Some(&user()), store).await.unwrap();
        w
    }

    #[test]
    fn flows_start_at_their_first_step() {
        assert_eq!(BookingWizard::new(movie(None), Flow::Theaters, today()).step(), WizardStep::Theaters);
        assert_eq!(BookingWizard::new(movie(None), Flow::Basic, today()).step(), WizardStep::Details);
    }

    #[test]
    fn date_must_be_within_window() {
        let mut w = BookingWizard::new(movie(None), Flow::Basic, today());
        assert!(w.select_date(today() + Duration::days(6)).is_ok());
        assert_eq!(w.select_date(today() + Duration::days(7)), Err(BookingError::DateOutOfRange));
        assert_eq!(w.select_date(today() - Duration::days(1)), Err(BookingError::DateOutOfRange));
        assert_eq!(w.booking_date(), today() + Duration::days(6));
    }

    #[test]
    fn date_change_clears_theater_selection() {
        let (mut w, _) = at_details();
        w.select_date(today() + Duration::days(1)).unwrap();
        assert_eq!(w.step(), WizardStep::Theaters);
        assert!(w.showtime().is_none());
        assert!(w.seat_map().is_none());
    }

    #[test]
    fn showtime_of_another_movie_is_refused() {
        let m = movie(None);
        let t = theater();
        let other = showtime(&movie(None), &t, None);
        let mut w = BookingWizard::new(m, Flow::Theaters, today());
        assert!(matches!(w.select_showtime(&other, &t), Err(BookingError::UnknownShowtime(_))));
        assert_eq!(w.step(), WizardStep::Theaters);
    }

    #[test]
    fn basic_flow_only_offers_fixed_times() {
        let mut w = BookingWizard::new(movie(None), Flow::Basic, today());
        assert_eq!(w.select_time("9:15 PM"), Err(BookingError::UnknownShowtime("9:15 PM".to_string())));
        w.select_time("4:00 PM").unwrap();
        assert_eq!(w.showtime().unwrap().time, "4:00 PM");
        assert_eq!(w.toggle_seat("A1".parse().unwrap()), Err(BookingError::NoSeatGrid));
    }

    #[test]
    fn seat_count_is_clamped_and_truncates_selection() {
        let (mut w, _) = at_details();
        assert_eq!(w.set_seat_count(25).unwrap(), 10);
        let map = w.seat_map().unwrap().clone();
        for seat in free_seats(&map, 4) {
            w.toggle_seat(seat).unwrap();
        }
        assert_eq!(w.set_seat_count(2).unwrap(), 2);
        assert_eq!(w.selected_seats().len(), 2);
        assert_eq!(w.set_seat_count(0).unwrap(), 1);
        assert_eq!(w.selected_seats().len(), 1);
    }

    #[test]
    fn toggling_respects_grid_and_limit() {
        let (mut w, _) = at_details();
        w.set_seat_count(2).unwrap();
        let map = w.seat_map().unwrap().clone();

        let filled = *map.filled().iter().next().unwrap();
        assert_eq!(w.toggle_seat(filled), Err(BookingError::SeatUnavailable(filled)));

        let free = free_seats(&map, 3);
        w.toggle_seat(free[0]).unwrap();
        w.toggle_seat(free[1]).unwrap();
        assert_eq!(w.toggle_seat(free[2]), Err(BookingError::SeatLimitReached { limit: 2 }));
        w.toggle_seat(free[0]).unwrap();
        assert!(!w.selected_seats().contains(&free[0]));
    }

    #[test]
    fn back_returns_to_theaters_and_keeps_selection() {
        let (mut w, _) = at_details();
        w.back().unwrap();
        assert_eq!(w.step(), WizardStep::Theaters);
        assert!(w.showtime().is_some());
        assert!(matches!(w.back(), Err(BookingError::InvalidTransition { .. })));
    }

    #[test]
    fn total_uses_multiplier_and_seat_count() {
        let (mut w, _) = at_details();
        w.set_seat_count(3).unwrap();
        assert_eq!(w.total_amount(), 900.0);
    }

    #[test]
    fn default_price_applies_to_unpriced_movies() {
        let w = BookingWizard::new(movie(None), Flow::Basic, today()).with_default_price(300.0);
        assert_eq!(w.total_amount(), 300.0);
        let w = BookingWizard::new(movie(Some(180.0)), Flow::Basic, today()).with_default_price(300.0);
        assert_eq!(w.total_amount(), 180.0);
    }

    #[tokio::test]
    async fn confirm_without_user_creates_nothing() {
        let store = InMemoryStore::new();
        let (mut w, _) = at_details();
        assert_eq!(w.confirm(None, &store).await, Err(BookingError::AuthRequired));
        assert_eq!(w.step(), WizardStep::Details);
        assert!(store.bookings().is_empty());
    }

    #[tokio::test]
    async fn confirm_requires_showtime() {
        let store = InMemoryStore::new();
        let mut w = BookingWizard::new(movie(None), Flow::Basic, today());
        assert_eq!(w.confirm(Some(&user()), &store).await, Err(BookingError::ShowtimeRequired));
        assert!(store.bookings().is_empty());
    }

    #[tokio::test]
    async fn confirm_creates_pending_booking() {
        let store = InMemoryStore::new();
        let (mut w, s) = at_details();
        w.set_seat_count(2).unwrap();
        let map = w.seat_map().unwrap().clone();
        for seat in free_seats(&map, 2) {
            w.toggle_seat(seat).unwrap();
        }
        let u = user();

        let booking = w.confirm(Some(&u), &store).await.unwrap();

        assert_eq!(w.step(), WizardStep::Payment { booking_id: booking.id });
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.user_id, u.user_id);
        assert_eq!(booking.showtime_id, Some(s.id));
        assert_eq!(booking.booking_time, "7:30 PM");
        assert_eq!(booking.seats, 2);
        assert_eq!(booking.seat_numbers.len(), 2);
        assert_eq!(booking.total_amount, 600.0);
    }

    #[tokio::test]
    async fn confirm_failure_stays_on_details() {
        let store = InMemoryStore::new();
        store.set_failing(true);
        let (mut w, _) = at_details();
        let err = w.confirm(Some(&user()), &store).await.unwrap_err();
        assert!(matches!(err, BookingError::Persistence(_)));
        assert_eq!(w.step(), WizardStep::Details);
    }

    #[tokio::test(start_paused = true)]
    async fn pay_marks_booking_paid_after_delay() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;
        let processor = MockPaymentProcessor::default();
        let started = tokio::time::Instant::now();

        let booking = w.pay(&upi(), &store, &processor).await.unwrap();

        assert!(started.elapsed() >= StdDuration::from_millis(2000));
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert_eq!(w.step(), WizardStep::Success { booking_id: booking.id });
        assert_eq!(store.bookings()[0].payment_status, PaymentStatus::Paid);
    }

    #[tokio::test(start_paused = true)]
    async fn pay_failure_stays_on_payment() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;
        let booking_id = w.step().booking_id().unwrap();
        store.set_failing(true);

        let err = w.pay(&upi(), &store, &MockPaymentProcessor::default()).await.unwrap_err();

        assert!(matches!(err, BookingError::Persistence(_)));
        assert_eq!(w.step(), WizardStep::Payment { booking_id });
        assert!(!w.payment_in_progress());

        // можно повторить
        store.set_failing(false);
        w.pay(&upi(), &store, &MockPaymentProcessor::default()).await.unwrap();
        assert_eq!(w.step(), WizardStep::Success { booking_id });
    }

    #[tokio::test(start_paused = true)]
    async fn second_payment_while_in_flight_is_refused() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;
        let _ticket = w.begin_payment(&upi()).unwrap();
        assert_eq!(w.begin_payment(&upi()).unwrap_err(), BookingError::PaymentInProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupted_pay_can_be_retried() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;
        let booking_id = w.step().booking_id().unwrap();
        let processor = MockPaymentProcessor::default();

        // клиент отвалился посреди задержки
        let first = tokio::time::timeout(StdDuration::from_millis(500), w.pay(&upi(), &store, &processor)).await;
        assert!(first.is_err());
        assert!(!w.payment_in_progress());
        assert_eq!(w.step(), WizardStep::Payment { booking_id });
        assert_eq!(store.status_update_calls(), 0);

        let booking = w.pay(&upi(), &store, &processor).await.unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert_eq!(w.step(), WizardStep::Success { booking_id });
    }

    #[tokio::test]
    async fn dropped_ticket_releases_payment_slot() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;

        let ticket = w.begin_payment(&upi()).unwrap();
        let copy = ticket.clone();
        drop(ticket);
        assert!(w.payment_in_progress());
        drop(copy);
        assert!(!w.payment_in_progress());

        let again = w.begin_payment(&upi()).unwrap();
        assert!(!again.is_cancelled());
        assert!(w.payment_in_progress());
    }

    #[tokio::test]
    async fn invalid_payment_details_keep_payment_step() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;
        let booking_id = w.step().booking_id().unwrap();

        let no_at = PaymentDetails::Upi(UpiDetails { upi_id: "anu.okaxis".to_string() });
        assert!(matches!(w.begin_payment(&no_at), Err(BookingError::InvalidPaymentDetails(_))));

        let short_card = PaymentDetails::Credit(CardDetails {
            card_number: "4111 1111".to_string(),
            expiry: "09/28".to_string(),
            cvv: "123".to_string(),
            card_name: "Anu Joseph".to_string(),
        });
        let err = w.pay(&short_card, &store, &MockPaymentProcessor::default()).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidPaymentDetails(ref msg) if msg.contains("card_number")));

        assert_eq!(w.step(), WizardStep::Payment { booking_id });
        assert!(!w.payment_in_progress());
        assert_eq!(store.status_update_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn card_payment_succeeds() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;
        let card = PaymentDetails::Debit(CardDetails {
            card_number: "5500 0000 0000 0004".to_string(),
            expiry: "12/29".to_string(),
            cvv: "321".to_string(),
            card_name: "Anu Joseph".to_string(),
        });
        let booking = w.pay(&card, &store, &MockPaymentProcessor::default()).await.unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_delay_cancels_payment() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;
        let processor = MockPaymentProcessor::default();
        let ticket = w.begin_payment(&upi()).unwrap();

        let (outcome, _) = tokio::join!(settle_payment(&ticket, &store, &processor), async {
            tokio::time::sleep(StdDuration::from_millis(500)).await;
            w.reset(today());
        });

        assert_eq!(outcome, Err(BookingError::PaymentCancelled));
        assert_eq!(w.finish_payment(ticket, outcome), Err(BookingError::PaymentCancelled));
        assert_eq!(store.status_update_calls(), 0);
        assert_eq!(store.bookings()[0].payment_status, PaymentStatus::Pending);
        assert_defaults(&w, Flow::Theaters);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_wizard_cancels_payment() {
        let store = InMemoryStore::new();
        let mut w = at_payment(&store).await;
        let ticket = w.begin_payment(&upi()).unwrap();
        drop(w);
        assert!(ticket.is_cancelled());
        let outcome = settle_payment(&ticket, &store, &MockPaymentProcessor::default()).await;
        assert_eq!(outcome, Err(BookingError::PaymentCancelled));
        assert_eq!(store.status_update_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_defaults_from_every_step() {
        let store = InMemoryStore::new();

        let mut w = BookingWizard::new(movie(None), Flow::Theaters, today());
        w.set_seat_count(4).unwrap();
        w.reset(today());
        assert_defaults(&w, Flow::Theaters);

        let (mut w, _) = at_details();
        w.set_seat_count(5).unwrap();
        w.reset(today());
        assert_defaults(&w, Flow::Theaters);

        let mut basic = BookingWizard::new(movie(None), Flow::Basic, today());
        basic.select_time("1:30 PM").unwrap();
        basic.select_date(today() + Duration::days(2)).unwrap();
        basic.reset(today());
        assert_defaults(&basic, Flow::Basic);

        let mut w = at_payment(&store).await;
        w.reset(today());
        assert_defaults(&w, Flow::Theaters);

        let mut w = at_payment(&store).await;
        w.pay(&upi(), &store, &MockPaymentProcessor::default()).await.unwrap();
        w.reset(today());
        assert_defaults(&w, Flow::Theaters);
    }

    #[test]
    fn operations_outside_their_step_are_rejected() {
        let mut w = BookingWizard::new(movie(None), Flow::Theaters, today());
        assert_eq!(
            w.toggle_seat("A1".parse().unwrap()),
            Err(BookingError::InvalidTransition { step: "theaters", action: "pick a seat" })
        );
        assert!(matches!(w.select_time("10:00 AM"), Err(BookingError::InvalidTransition { .. })));
        assert!(matches!(w.begin_payment(&upi()), Err(BookingError::InvalidTransition { .. })));
    }

    #[test]
    fn view_reflects_state() {
        let (mut w, s) = at_details();
        w.set_seat_count(3).unwrap();
        let view = w.view();
        assert_eq!(view.step, WizardStep::Details);
        assert_eq!(view.total_amount, 900.0);
        assert_eq!(view.showtime.unwrap().showtime_id, Some(s.id));
        assert_eq!(view.last_date, today() + Duration::days(6));
        assert!(view.available_times.is_empty());

        let json = serde_json::to_value(BookingWizard::new(movie(None), Flow::Basic, today()).view()).unwrap();
        assert_eq!(json["step"]["name"], "details");
        assert_eq!(json["available_times"].as_array().unwrap().len(), 5);
    }
}
