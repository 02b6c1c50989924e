//! Persistence collaborator.
//!
//! Всё хранение данных вынесено за трейт [`BookingStore`]: в продакшене это
//! PostgreSQL ([`postgres`]), в тестах [`memory::InMemoryStore`].

pub mod postgres;
pub mod memory;

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    Booking, BookingWithMovie, Movie, NewBooking, PaymentStatus, ProfileUpdate,
    ProfileWithPreferences, ShowtimeWithTheater, Theater,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("record not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(e: validator::ValidationErrors) -> Self {
        StoreError::Validation(e.to_string())
    }
}

/// Результат обновления доступности фильмов.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub movies_now_available: u64,
    pub movies_archived: u64,
    pub timestamp: DateTime<Utc>,
}

pub trait BookingStore: Send + Sync {
    /// Inserts a `pending` booking and returns the stored row with its id.
    fn create_booking(
        &self,
        booking: NewBooking,
    ) -> impl Future<Output = Result<Booking, StoreError>> + Send;

    fn update_booking_payment_status(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
    ) -> impl Future<Output = Result<Booking, StoreError>> + Send;

    /// Newest first, each joined with the movie's display fields.
    fn list_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<BookingWithMovie>, StoreError>> + Send;

    /// Available showtimes of a movie, optionally for one date, joined with theaters.
    fn list_showtimes_for_movie(
        &self,
        movie_id: Uuid,
        date: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<ShowtimeWithTheater>, StoreError>> + Send;

    /// Available movies, best rated first.
    fn list_available_movies(&self) -> impl Future<Output = Result<Vec<Movie>, StoreError>> + Send;

    fn get_movie(&self, movie_id: Uuid) -> impl Future<Output = Result<Option<Movie>, StoreError>> + Send;

    fn list_theaters(&self) -> impl Future<Output = Result<Vec<Theater>, StoreError>> + Send;

    /// Releases movies whose release date has come and archives the ones
    /// released more than `archive_after_days` ago.
    fn refresh_movie_availability(
        &self,
        today: NaiveDate,
        archive_after_days: i64,
    ) -> impl Future<Output = Result<AvailabilityReport, StoreError>> + Send;

    fn get_profile(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<ProfileWithPreferences, StoreError>> + Send;

    fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> impl Future<Output = Result<ProfileWithPreferences, StoreError>> + Send;
}

impl<T: BookingStore> BookingStore for Arc<T> {
    fn create_booking(&self, booking: NewBooking) -> impl Future<Output = Result<Booking, StoreError>> + Send {
        (**self).create_booking(booking)
    }

    fn update_booking_payment_status(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
    ) -> impl Future<Output = Result<Booking, StoreError>> + Send {
        (**self).update_booking_payment_status(booking_id, status)
    }

    fn list_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<BookingWithMovie>, StoreError>> + Send {
        (**self).list_bookings_for_user(user_id)
    }

    fn list_showtimes_for_movie(
        &self,
        movie_id: Uuid,
        date: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<ShowtimeWithTheater>, StoreError>> + Send {
        (**self).list_showtimes_for_movie(movie_id, date)
    }

    fn list_available_movies(&self) -> impl Future<Output = Result<Vec<Movie>, StoreError>> + Send {
        (**self).list_available_movies()
    }

    fn get_movie(&self, movie_id: Uuid) -> impl Future<Output = Result<Option<Movie>, StoreError>> + Send {
        (**self).get_movie(movie_id)
    }

    fn list_theaters(&self) -> impl Future<Output = Result<Vec<Theater>, StoreError>> + Send {
        (**self).list_theaters()
    }

    fn refresh_movie_availability(
        &self,
        today: NaiveDate,
        archive_after_days: i64,
    ) -> impl Future<Output = Result<AvailabilityReport, StoreError>> + Send {
        (**self).refresh_movie_availability(today, archive_after_days)
    }

    fn get_profile(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<ProfileWithPreferences, StoreError>> + Send {
        (**self).get_profile(user_id)
    }

    fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> impl Future<Output = Result<ProfileWithPreferences, StoreError>> + Send {
        (**self).update_profile(user_id, update)
    }
}

// Общая проверка полей перед вставкой
pub(crate) fn validate_new_booking(booking: &NewBooking) -> Result<(), StoreError> {
    booking.validate()?;
    Ok(())
}

pub(crate) fn archive_cutoff(today: NaiveDate, archive_after_days: i64) -> NaiveDate {
    today - chrono::Duration::days(archive_after_days)
}
