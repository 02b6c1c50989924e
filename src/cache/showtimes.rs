use chrono::NaiveDate;
use uuid::Uuid;

use crate::cache::CacheService;
use crate::models::ShowtimeWithTheater;
use crate::store::{BookingStore, StoreError};

const SHOWTIMES_TTL_SECONDS: u64 = 60;

fn showtimes_key(movie_id: Uuid, date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => format!("showtimes:{}:{}", movie_id, date),
        None => format!("showtimes:{}:all", movie_id),
    }
}

impl CacheService {
    /// Строки сеансов как их вернула БД; группировка делается после кеша.
    pub async fn get_showtimes(
        &self,
        movie_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ShowtimeWithTheater>, StoreError> {
        let key = showtimes_key(movie_id, date);
        if let Some(rows) = self.get_json::<Vec<ShowtimeWithTheater>>(&key).await {
            return Ok(rows);
        }

        let rows = self.db.list_showtimes_for_movie(movie_id, date).await?;
        self.set_json(&key, &rows, SHOWTIMES_TTL_SECONDS).await;
        Ok(rows)
    }
}
