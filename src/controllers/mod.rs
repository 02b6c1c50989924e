pub mod movies;
pub mod seats;
pub mod bookings;
pub mod sessions;
pub mod profile;
pub mod auth;

use axum::Router;
use std::sync::Arc;

pub(crate) use crate::booking::today;

pub fn routes(state: &crate::AppState) -> Router<Arc<crate::AppState>> {
    let booking_sessions: Router<Arc<crate::AppState>> = sessions::routes().with_state(state.sessions.clone());

    Router::new()
        .merge(movies::routes())
        .merge(seats::routes())
        .merge(bookings::routes())
        .merge(booking_sessions)
        .merge(profile::routes())
        .merge(auth::routes())
}
