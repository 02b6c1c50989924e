use chrono::{NaiveDate, Utc};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;
use validator::Validate;

use super::{archive_cutoff, validate_new_booking, AvailabilityReport, BookingStore, StoreError};
use crate::database::Database;
use crate::models::{
    Booking, BookingWithMovie, Movie, MovieSummary, NewBooking, PaymentStatus, Profile,
    ProfileUpdate, ProfileWithPreferences, Showtime, ShowtimeWithTheater, Theater, UserPreferences,
};

const BOOKING_COLUMNS: &str = "id, user_id, movie_id, theater_id, showtime_id, booking_date, booking_time, \
     seats, seat_numbers, total_amount, payment_status, created_at";

const MOVIE_COLUMNS: &str = "id, title, description, duration, language, genres, price, rating, \
     poster_url, release_date, is_available, created_at";

fn showtime_from_row(row: &PgRow) -> Result<ShowtimeWithTheater, sqlx::Error> {
    let showtime = Showtime::from_row(row)?;
    let theater_id: Option<Uuid> = row.try_get("t_id")?;
    let theater = match theater_id {
        Some(id) => Some(Theater {
            id,
            name: row.try_get("t_name")?,
            location: row.try_get("t_location")?,
            city: row.try_get("t_city")?,
            address: row.try_get("t_address")?,
            amenities: row.try_get("t_amenities")?,
        }),
        None => None,
    };
    Ok(ShowtimeWithTheater { showtime, theater })
}

fn booking_with_movie_from_row(row: &PgRow) -> Result<BookingWithMovie, sqlx::Error> {
    let booking = Booking::from_row(row)?;
    let title: Option<String> = row.try_get("movie_title")?;
    let movie = match title {
        Some(title) => Some(MovieSummary {
            title,
            poster_url: row.try_get("movie_poster_url")?,
            duration: row.try_get("movie_duration")?,
            language: row.try_get("movie_language")?,
        }),
        None => None,
    };
    Ok(BookingWithMovie { booking, movie })
}

impl BookingStore for Database {
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        validate_new_booking(&booking)?;

        let row = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (user_id, movie_id, theater_id, showtime_id, booking_date, booking_time,
                                   seats, seat_numbers, total_amount, payment_status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking.user_id)
        .bind(booking.movie_id)
        .bind(booking.theater_id)
        .bind(booking.showtime_id)
        .bind(booking.booking_date)
        .bind(&booking.booking_time)
        .bind(booking.seats)
        .bind(&booking.seat_numbers)
        .bind(booking.total_amount)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created booking {} for user {}", row.id, row.user_id);
        Ok(row)
    }

    async fn update_booking_payment_status(
        &self,
        booking_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Booking, StoreError> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET payment_status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingWithMovie>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.user_id, b.movie_id, b.theater_id, b.showtime_id, b.booking_date,
                   b.booking_time, b.seats, b.seat_numbers, b.total_amount, b.payment_status,
                   b.created_at,
                   m.title AS movie_title, m.poster_url AS movie_poster_url,
                   m.duration AS movie_duration, m.language AS movie_language
            FROM bookings b
            LEFT JOIN movies m ON m.id = b.movie_id
            WHERE b.user_id = $1
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(booking_with_movie_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn list_showtimes_for_movie(
        &self,
        movie_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ShowtimeWithTheater>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.movie_id, s.theater_id, s.show_date, s.show_time, s.price_multiplier,
                   s.available_seats, s.is_available,
                   t.id AS t_id, t.name AS t_name, t.location AS t_location, t.city AS t_city,
                   t.address AS t_address, t.amenities AS t_amenities
            FROM showtimes s
            LEFT JOIN theaters t ON t.id = s.theater_id
            WHERE s.movie_id = $1
              AND s.is_available = true
              AND ($2::date IS NULL OR s.show_date = $2)
            ORDER BY s.show_time
            "#,
        )
        .bind(movie_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(showtime_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn list_available_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies
             WHERE is_available = true
             ORDER BY rating DESC NULLS LAST"
        ))
        .fetch_all(&self.pool)
        .await?;

        // битые строки не показываем
        Ok(movies
            .into_iter()
            .filter(|m| match m.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Skipping movie {}: {}", m.id, e);
                    false
                }
            })
            .collect())
    }

    async fn get_movie(&self, movie_id: Uuid) -> Result<Option<Movie>, StoreError> {
        let movie = sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn list_theaters(&self) -> Result<Vec<Theater>, StoreError> {
        let theaters = sqlx::query_as::<_, Theater>(
            "SELECT id, name, location, city, address, amenities FROM theaters ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(theaters)
    }

    async fn refresh_movie_availability(
        &self,
        today: NaiveDate,
        archive_after_days: i64,
    ) -> Result<AvailabilityReport, StoreError> {
        let released = sqlx::query(
            "UPDATE movies SET is_available = true
             WHERE release_date <= $1 AND is_available = false",
        )
        .bind(today)
        .execute(&self.pool)
        .await?
        .rows_affected();

        // ошибка архивации не отменяет результат первого шага
        let archived = match sqlx::query(
            "UPDATE movies SET is_available = false
             WHERE release_date < $1 AND is_available = true",
        )
        .bind(archive_cutoff(today, archive_after_days))
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected(),
            Err(e) => {
                tracing::error!("Error archiving old movies: {:?}", e);
                0
            }
        };

        Ok(AvailabilityReport {
            movies_now_available: released,
            movies_archived: archived,
            timestamp: Utc::now(),
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<ProfileWithPreferences, StoreError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT user_id, full_name, email FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .unwrap_or(Profile { user_id, full_name: None, email: None });

        let preferences = sqlx::query_as::<_, UserPreferences>(
            "SELECT user_id, receive_notifications, preferred_language FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .unwrap_or_else(|| UserPreferences::defaults_for(user_id));

        Ok(ProfileWithPreferences { profile, preferences })
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<ProfileWithPreferences, StoreError> {
        update.validate()?;

        let mut tx = self.pool.begin().await?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, full_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
              SET full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                  updated_at = NOW()
            RETURNING user_id, full_name, email
            "#,
        )
        .bind(user_id)
        .bind(&update.full_name)
        .fetch_one(&mut *tx)
        .await?;

        let preferences = sqlx::query_as::<_, UserPreferences>(
            r#"
            INSERT INTO user_preferences (user_id, receive_notifications, preferred_language)
            VALUES ($1, COALESCE($2, true), COALESCE($3, 'English'))
            ON CONFLICT (user_id) DO UPDATE
              SET receive_notifications = COALESCE($2, user_preferences.receive_notifications),
                  preferred_language = COALESCE($3, user_preferences.preferred_language),
                  updated_at = NOW()
            RETURNING user_id, receive_notifications, preferred_language
            "#,
        )
        .bind(user_id)
        .bind(update.receive_notifications)
        .bind(&update.preferred_language)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ProfileWithPreferences { profile, preferences })
    }
}
