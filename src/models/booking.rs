use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Option<Uuid>,
    pub showtime_id: Option<Uuid>,
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub seats: i32,
    pub seat_numbers: Vec<String>,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Запись для вставки; статус всегда `pending`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Option<Uuid>,
    pub showtime_id: Option<Uuid>,
    pub booking_date: NaiveDate,
    #[validate(length(min = 1, message = "booking time is required"))]
    pub booking_time: String,
    #[validate(range(min = 1, max = 10))]
    pub seats: i32,
    pub seat_numbers: Vec<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub total_amount: f64,
}

/// Поля фильма для истории бронирований.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MovieSummary {
    pub title: String,
    pub poster_url: Option<String>,
    pub duration: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWithMovie {
    #[serde(flatten)]
    pub booking: Booking,
    pub movie: Option<MovieSummary>,
}
