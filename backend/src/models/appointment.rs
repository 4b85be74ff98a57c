use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
}

/// Full appointment record as stored in the database.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub barber_id: Uuid,
    pub service_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    pub customer_name: String,
    pub customer_phone: String,
    pub status: AppointmentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub barber_slug: String,
    pub service_id: Uuid,
    /// RFC 3339 instant; parsed and validated by the booking flow, not serde,
    /// so a malformed value gets a proper error instead of a rejection.
    pub start_at: String,
    pub customer_name: String,
    pub customer_phone: String,
}

/// Subset returned to the customer after a successful booking.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookedAppointment {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    pub customer_name: String,
    pub customer_phone: String,
}

/// Day-view row for the admin panel, service details joined in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminAppointment {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    pub customer_name: String,
    pub customer_phone: String,
    pub status: AppointmentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub service_name: Option<String>,
    pub service_duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: AppointmentStatus,
}
