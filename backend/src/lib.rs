pub mod api;
pub mod auth;
pub mod booking;
pub mod config;
pub mod error;
pub mod ics;
pub mod models;
pub mod slots;
pub mod watcher;

use std::time::Duration;

use sqlx::PgPool;

/// Shared application state available to all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Poll cadence handed to notification watchers once push delivery is lost.
    pub notify_poll: Duration,
}

impl axum::extract::FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
