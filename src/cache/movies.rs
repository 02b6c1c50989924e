use tracing::debug;

use crate::cache::CacheService;
use crate::models::Movie;
use crate::store::{BookingStore, StoreError};

const AVAILABLE_MOVIES_KEY: &str = "movies:available";
const MOVIES_TTL_SECONDS: u64 = 300;

impl CacheService {
    /// Доступные фильмы, сначала из кеша.
    pub async fn get_available_movies(&self) -> Result<Vec<Movie>, StoreError> {
        if let Some(movies) = self.get_json::<Vec<Movie>>(AVAILABLE_MOVIES_KEY).await {
            return Ok(movies);
        }

        let movies = self.db.list_available_movies().await?;
        self.set_json(AVAILABLE_MOVIES_KEY, &movies, MOVIES_TTL_SECONDS).await;
        Ok(movies)
    }

    pub async fn invalidate_movies(&self) {
        debug!("Invalidating movie cache");
        self.delete(AVAILABLE_MOVIES_KEY).await;
    }
}
