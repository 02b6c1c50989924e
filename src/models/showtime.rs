use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::NaiveDate;
use uuid::Uuid;

use super::Theater;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Showtime {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub show_date: NaiveDate,
    /// 12-часовой формат, например "7:30 PM"
    pub show_time: String,
    pub price_multiplier: Option<f64>,
    pub available_seats: Option<i32>,
    pub is_available: bool,
}

impl Showtime {
    /// Множитель цены; отсутствующий или некорректный считается равным 1.
    pub fn multiplier(&self) -> f64 {
        match self.price_multiplier {
            Some(m) if m > 0.0 => m,
            _ => 1.0,
        }
    }
}

/// Сеанс вместе с кинотеатром (JOIN theaters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowtimeWithTheater {
    #[serde(flatten)]
    pub showtime: Showtime,
    pub theater: Option<Theater>,
}
