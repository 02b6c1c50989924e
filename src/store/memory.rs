//! In-memory [`BookingStore`], used by tests and local runs without PostgreSQL.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{archive_cutoff, validate_new_booking, AvailabilityReport, BookingStore, StoreError};
use crate::models::{
    Booking, BookingWithMovie, Movie, MovieSummary, NewBooking, PaymentStatus, Profile,
    ProfileUpdate, ProfileWithPreferences, Showtime, ShowtimeWithTheater, Theater, UserPreferences,
};

#[derive(Default)]
struct Inner {
    movies: Vec<Movie>,
    theaters: Vec<Theater>,
    showtimes: Vec<Showtime>,
    bookings: Vec<Booking>,
    profiles: Vec<Profile>,
    preferences: Vec<UserPreferences>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    failing: AtomicBool,
    status_updates: std::sync::atomic::AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Пока включено, все записи завершаются ошибкой `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes are failing".to_string()));
        }
        Ok(())
    }

    pub fn insert_movie(&self, movie: Movie) {
        self.lock().movies.push(movie);
    }

    pub fn insert_theater(&self, theater: Theater) {
        self.lock().theaters.push(theater);
    }

    pub fn insert_showtime(&self, showtime: Showtime) {
        self.lock().showtimes.push(showtime);
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.lock().bookings.clone()
    }

    pub fn movies(&self) -> Vec<Movie> {
        self.lock().movies.clone()
    }

    /// Number of payment status updates attempted so far.
    pub fn status_update_calls(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }
}

impl BookingStore for InMemoryStore {
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        self.check_writable()?;
        validate_new_booking(&booking)?;

        let mut inner = self.lock();
        // created_at должен строго расти, иначе порядок истории неоднозначен
        let mut created_at = Utc::now();
        if let Some(last) = inner.bookings.iter().map(|b| b.created_at).max() {
            if created_at <= last {
                created_at = last + chrono::Duration::microseconds(1);
            }
        }
        let row = Booking {
            id: Uuid::new_v4(),
            user_id: booking.user_id,
            movie_id: booking.movie_id,
            theater_id: booking.theater_id,
            showtime_id: booking.showtime_id,
            booking_date: booking.booking_date,
            booking_time: booking.booking_time,
            seats: booking.seats,
            seat_numbers: booking.seat_numbers,
            total_amount: booking.total_amount,
            payment_status: PaymentStatus::Pending,
            created_at,
        };
        inner.bookings.push(row.clone());
        Ok(row)
    }

    async fn update_booking_payment_status(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Booking, StoreError> {
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;

        let mut inner = self.lock();
        let booking = inner
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(StoreError::NotFound)?;
        booking.payment_status = status;
        Ok(booking.clone())
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingWithMovie>, StoreError> {
        let inner = self.lock();
        let mut rows: Vec<BookingWithMovie> = inner
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| BookingWithMovie {
                booking: b.clone(),
                movie: inner.movies.iter().find(|m| m.id == b.movie_id).map(|m| MovieSummary {
                    title: m.title.clone(),
                    poster_url: m.poster_url.clone(),
                    duration: m.duration.clone(),
                    language: m.language.clone(),
                }),
            })
            .collect();
        rows.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
        Ok(rows)
    }

    async fn list_showtimes_for_movie(
        &self,
        movie_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ShowtimeWithTheater>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .showtimes
            .iter()
            .filter(|s| s.movie_id == movie_id && s.is_available)
            .filter(|s| date.map_or(true, |d| s.show_date == d))
            .map(|s| ShowtimeWithTheater {
                showtime: s.clone(),
                theater: inner.theaters.iter().find(|t| t.id == s.theater_id).cloned(),
            })
            .collect())
    }

    async fn list_available_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let mut movies: Vec<Movie> = self
            .lock()
            .movies
            .iter()
            .filter(|m| m.is_available && m.validate().is_ok())
            .cloned()
            .collect();
        movies.sort_by(|a, b| {
            let a = a.rating.unwrap_or(f64::MIN);
            let b = b.rating.unwrap_or(f64::MIN);
            b.total_cmp(&a)
        });
        Ok(movies)
    }

    async fn get_movie(&self, movie_id: Uuid) -> Result<Option<Movie>, StoreError> {
        Ok(self.lock().movies.iter().find(|m| m.id == movie_id).cloned())
    }

    async fn list_theaters(&self) -> Result<Vec<Theater>, StoreError> {
        let mut theaters = self.lock().theaters.clone();
        theaters.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(theaters)
    }

    async fn refresh_movie_availability(
        &self,
        today: NaiveDate,
        archive_after_days: i64,
    ) -> Result<AvailabilityReport, StoreError> {
        self.check_writable()?;

        let cutoff = archive_cutoff(today, archive_after_days);
        let mut inner = self.lock();
        let mut released = 0;
        for movie in inner.movies.iter_mut() {
            if !movie.is_available && movie.release_date.is_some_and(|d| d <= today) {
                movie.is_available = true;
                released += 1;
            }
        }
        let mut archived = 0;
        for movie in inner.movies.iter_mut() {
            if movie.is_available && movie.release_date.is_some_and(|d| d < cutoff) {
                movie.is_available = false;
                archived += 1;
            }
        }

        Ok(AvailabilityReport {
            movies_now_available: released,
            movies_archived: archived,
            timestamp: Utc::now(),
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<ProfileWithPreferences, StoreError> {
        let inner = self.lock();
        let profile = inner
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned()
            .unwrap_or(Profile { user_id, full_name: None, email: None });
        let preferences = inner
            .preferences
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned()
            .unwrap_or_else(|| UserPreferences::defaults_for(user_id));
        Ok(ProfileWithPreferences { profile, preferences })
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<ProfileWithPreferences, StoreError> {
        self.check_writable()?;
        update.validate()?;

        let mut inner = self.lock();

        let idx = match inner.profiles.iter().position(|p| p.user_id == user_id) {
            Some(idx) => idx,
            None => {
                inner.profiles.push(Profile { user_id, full_name: None, email: None });
                inner.profiles.len() - 1
            }
        };
        if let Some(name) = update.full_name {
            inner.profiles[idx].full_name = Some(name);
        }
        let profile = inner.profiles[idx].clone();

        let idx = match inner.preferences.iter().position(|p| p.user_id == user_id) {
            Some(idx) => idx,
            None => {
                inner.preferences.push(UserPreferences::defaults_for(user_id));
                inner.preferences.len() - 1
            }
        };
        if let Some(flag) = update.receive_notifications {
            inner.preferences[idx].receive_notifications = flag;
        }
        if let Some(language) = update.preferred_language {
            inner.preferences[idx].preferred_language = language;
        }
        let preferences = inner.preferences[idx].clone();

        Ok(ProfileWithPreferences { profile, preferences })
    }
}
