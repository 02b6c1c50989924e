use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::models::SeatId;
use crate::store::StoreError;

/// Ошибки мастера бронирования.
///
/// Validation errors leave the wizard where it was; persistence errors carry
/// the underlying message so it can be shown to the user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("sign in to continue booking")]
    AuthRequired,

    #[error("please select a showtime to continue")]
    ShowtimeRequired,

    #[error("date must be within the next 7 days")]
    DateOutOfRange,

    #[error("'{0}' is not an offered showtime")]
    UnknownShowtime(String),

    #[error("seat {0} is already taken")]
    SeatUnavailable(SeatId),

    #[error("you can select at most {limit} seat(s)")]
    SeatLimitReached { limit: usize },

    #[error("seat selection needs a concrete showtime")]
    NoSeatGrid,

    #[error("cannot {action} while on the {step} step")]
    InvalidTransition { step: &'static str, action: &'static str },

    #[error("invalid payment details: {0}")]
    InvalidPaymentDetails(String),

    #[error("payment is already being processed")]
    PaymentInProgress,

    #[error("payment was cancelled")]
    PaymentCancelled,

    #[error("{0}")]
    Persistence(String),
}

impl BookingError {
    pub fn is_validation(&self) -> bool {
        !matches!(self, BookingError::PaymentCancelled | BookingError::Persistence(_))
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        BookingError::Persistence(e.to_string())
    }
}

/// Ошибка HTTP-слоя, превращается в JSON `{error, code}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Booking(BookingError::AuthRequired) | AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED", self.to_string())
            }
            AppError::Booking(BookingError::PaymentCancelled) => {
                (StatusCode::CONFLICT, "PAYMENT_CANCELLED", self.to_string())
            }
            AppError::Booking(BookingError::PaymentInProgress) => {
                (StatusCode::CONFLICT, "PAYMENT_IN_PROGRESS", self.to_string())
            }
            AppError::Booking(BookingError::Persistence(msg)) => {
                tracing::error!("Booking persistence failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "PERSISTENCE_ERROR", msg.clone())
            }
            AppError::Booking(e) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", e.to_string()),
            AppError::Store(StoreError::NotFound) | AppError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            AppError::Store(StoreError::Validation(msg)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "PERSISTENCE_ERROR", "Storage is unavailable".to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message, "code": code }))).into_response()
    }
}
