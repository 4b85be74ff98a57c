pub mod admin;
pub mod appointments;
pub mod barbers;
pub mod slots;

use axum::{
    routing::{get, patch, post},
    Router,
};
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::AppState;

/// Query-string calendar date, `YYYY-MM-DD`.
pub(crate) const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public booking surface
        .route("/api/barbers/:slug", get(barbers::get_by_slug))
        .route("/api/slots", get(slots::list))
        .route("/api/appointments", post(appointments::create))
        // Admin surface (barber slug + admin secret capability)
        .route("/api/admin/verify", post(admin::verify))
        .route("/api/admin/appointments", get(admin::list_appointments))
        .route("/api/admin/appointments/:id", patch(admin::update_appointment))
        .route("/api/admin/appointments/:id/ics", get(admin::appointment_ics))
        .route(
            "/api/admin/overrides",
            get(admin::list_overrides).post(admin::create_override),
        )
        .route("/api/admin/notifications/ws", get(admin::notifications_ws))
        .with_state(state)
}
