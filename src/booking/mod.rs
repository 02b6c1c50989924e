//! Ядро бронирования: схема зала, группировка сеансов, расчёт стоимости
//! и пошаговый мастер оформления заказа.

pub mod seating;
pub mod showtimes;
pub mod pricing;
pub mod wizard;
pub mod sessions;

pub use seating::{compute_filled_seats, SeatMap, SeatSelection};
pub use showtimes::{group_by_theater, to_24_hour, GroupedShowtimes, ShowTime, TheaterShowtimes};
pub use wizard::{BookingWizard, Flow, PaymentTicket, WizardStep, WizardView};
pub use sessions::WizardSessions;

/// Сегодняшняя дата по часам сервера: от неё считаются окно бронирования
/// и доступность фильмов.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
