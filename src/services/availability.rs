//! Периодическое обновление доступности фильмов.
//!
//! Фильмы с наступившей датой релиза открываются для бронирования, фильмы
//! старше `archive_after_days` уходят в архив. После каждого прогона кеш
//! списка фильмов сбрасывается.

use std::time::Duration;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::booking::today;
use crate::cache::CacheService;
use crate::config::AvailabilityConfig;
use crate::store::{AvailabilityReport, BookingStore, StoreError};

/// One refresh pass for `today`.
pub async fn refresh_once<S: BookingStore>(
    store: &S,
    cache: Option<&CacheService>,
    today: NaiveDate,
    archive_after_days: i64,
) -> Result<AvailabilityReport, StoreError> {
    let report = store.refresh_movie_availability(today, archive_after_days).await?;

    if report.movies_now_available > 0 || report.movies_archived > 0 {
        info!(
            released = report.movies_now_available,
            archived = report.movies_archived,
            "Movie availability updated"
        );
    } else {
        debug!("Movie availability: nothing to change");
    }

    if let Some(cache) = cache {
        cache.invalidate_movies().await;
    }
    Ok(report)
}

/// Runs the refresh loop until `cancel` fires. The first pass runs immediately.
pub async fn run<S: BookingStore>(
    store: S,
    cache: Option<CacheService>,
    config: AvailabilityConfig,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs(config.refresh_interval_seconds.max(1));
    info!(
        interval_secs = period.as_secs(),
        archive_after_days = config.archive_after_days,
        "Availability refresh job started"
    );

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Availability refresh job stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = refresh_once(&store, cache.as_ref(), today(), config.archive_after_days).await {
                    error!(error = %e, "Availability refresh failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Movie;
    use chrono::Utc;
    use crate::store::memory::InMemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    fn movie(title: &str, release_date: Option<NaiveDate>, is_available: bool) -> Movie {
        Movie {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            duration: None,
            language: None,
            genres: vec![],
            price: Some(200.0),
            rating: None,
            poster_url: None,
            release_date,
            is_available,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn availability(store: &InMemoryStore, title: &str) -> bool {
        store.movies().into_iter().find(|m| m.title == title).unwrap().is_available
    }

    #[tokio::test]
    async fn releases_and_archives() {
        let today = date(2026, 6, 1);
        let store = InMemoryStore::new();
        store.insert_movie(movie("upcoming", Some(date(2026, 6, 20)), false));
        store.insert_movie(movie("released today", Some(today), false));
        store.insert_movie(movie("running", Some(date(2026, 4, 1)), true));
        store.insert_movie(movie("old", Some(date(2026, 1, 1)), true));
        store.insert_movie(movie("no date", None, true));

        let report = refresh_once(&store, None, today, 90).await.unwrap();

        assert_eq!(report.movies_now_available, 1);
        assert_eq!(report.movies_archived, 1);
        assert!(!availability(&store, "upcoming"));
        assert!(availability(&store, "released today"));
        assert!(availability(&store, "running"));
        assert!(!availability(&store, "old"));
        assert!(availability(&store, "no date"));
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let store = InMemoryStore::new();
        store.set_failing(true);
        assert!(refresh_once(&store, None, date(2026, 6, 1), 90).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_runs_until_cancelled() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_movie(movie("released", Some(date(2020, 1, 1)), false));

        let cancel = CancellationToken::new();
        let config = AvailabilityConfig {
            enabled: true,
            refresh_interval_seconds: 60,
            archive_after_days: 100_000,
        };
        let handle = tokio::spawn(run(store.clone(), None, config, cancel.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(availability(&store, "released"));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn loop_uses_the_booking_calendar() {
        let store = Arc::new(InMemoryStore::new());
        let today = crate::booking::today();
        store.insert_movie(movie("opens today", Some(today), false));
        store.insert_movie(movie("opens tomorrow", today.succ_opt(), false));

        let cancel = CancellationToken::new();
        let config = AvailabilityConfig {
            enabled: true,
            refresh_interval_seconds: 3600,
            archive_after_days: 90,
        };
        let handle = tokio::spawn(run(store.clone(), None, config, cancel.clone()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(availability(&store, "opens today"));
        assert!(!availability(&store, "opens tomorrow"));
    }
}
