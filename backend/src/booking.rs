use sqlx::PgPool;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime, Time};
use uuid::Uuid;

use crate::error::{is_conflict_violation, AppError, Result};
use crate::models::appointment::{BookedAppointment, CreateAppointmentRequest};
use crate::models::barber::{Barber, Service};

/// Booking attempts allowed per origin within the trailing [`ORIGIN_WINDOW`].
pub const ORIGIN_ATTEMPT_LIMIT: i64 = 10;
/// Trailing window for the per-origin attempt counter.
pub const ORIGIN_WINDOW: Duration = Duration::minutes(10);
/// Booked appointments one phone number may hold per barber per local day.
pub const PHONE_DAILY_LIMIT: i64 = 3;

const SLOT_TAKEN: &str = "This time slot is already booked. Please choose another slot.";

/// Admits one booking request end to end: input normalization, abuse caps,
/// an advisory overlap pre-check and the constraint-guarded insert.
///
/// The pre-check only buys a fast, friendly rejection. Two requests can both
/// pass it for the same interval; the loser trips the exclusion constraint
/// on insert and gets the same conflict message.
pub async fn create(
    pool: &PgPool,
    origin: &str,
    req: CreateAppointmentRequest,
) -> Result<BookedAppointment> {
    let name = req.customer_name.trim().to_string();
    let phone = normalize_phone(&req.customer_phone);
    if name.chars().count() < 2 {
        return Err(AppError::BadRequest(
            "customer_name must be at least 2 characters".into(),
        ));
    }
    if phone.chars().count() < 10 {
        return Err(AppError::BadRequest(
            "customer_phone must be at least 10 characters".into(),
        ));
    }

    let start_at = OffsetDateTime::parse(&req.start_at, &Rfc3339)
        .map_err(|_| AppError::BadRequest("start_at must be a valid RFC 3339 timestamp".into()))?;

    let barber = sqlx::query_as::<_, Barber>(
        "SELECT id, slug, name, open_time, close_time, slot_minutes, utc_offset_minutes, \
         is_active, admin_secret, created_at, updated_at \
         FROM barbers WHERE slug = $1 AND is_active = TRUE",
    )
    .bind(&req.barber_slug)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Barber not found".into()))?;

    let service = sqlx::query_as::<_, Service>(
        "SELECT id, barber_id, name, duration_minutes, price_cents, created_at \
         FROM services WHERE id = $1 AND barber_id = $2",
    )
    .bind(req.service_id)
    .bind(barber.id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Service not found".into()))?;

    let end_at = start_at + Duration::minutes(i64::from(service.duration_minutes));

    // Per-origin attempt cap over the trailing window.
    let since = OffsetDateTime::now_utc() - ORIGIN_WINDOW;
    let attempts: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointment_attempts WHERE origin = $1 AND created_at >= $2",
    )
    .bind(origin)
    .bind(since)
    .fetch_one(pool)
    .await?;
    if attempts >= ORIGIN_ATTEMPT_LIMIT {
        return Err(AppError::RateLimited(
            "Too many booking attempts. Please try again in 10 minutes.".into(),
        ));
    }

    // Daily per-phone cap, counted from the requested day's local midnight.
    let day_start = start_at
        .to_offset(barber.utc_offset())
        .replace_time(Time::MIDNIGHT);
    let day_end = day_start + Duration::days(1);
    let booked_today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments \
         WHERE barber_id = $1 AND customer_phone = $2 AND status = 'booked' \
         AND created_at >= $3 AND created_at < $4",
    )
    .bind(barber.id)
    .bind(&phone)
    .bind(day_start)
    .bind(day_end)
    .fetch_one(pool)
    .await?;
    if booked_today >= PHONE_DAILY_LIMIT {
        return Err(AppError::RateLimited(format!(
            "This phone number already has {} bookings for that day.",
            PHONE_DAILY_LIMIT
        )));
    }

    // Advisory overlap pre-check, half-open on both sides.
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM appointments \
         WHERE barber_id = $1 AND status = 'booked' AND start_at < $2 AND end_at > $3)",
    )
    .bind(barber.id)
    .bind(end_at)
    .bind(start_at)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(AppError::Conflict(SLOT_TAKEN.into()));
    }

    let booked = sqlx::query_as::<_, BookedAppointment>(
        "INSERT INTO appointments \
         (id, barber_id, service_id, start_at, end_at, customer_name, customer_phone, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'booked') \
         RETURNING id, start_at, end_at, customer_name, customer_phone",
    )
    .bind(Uuid::new_v4())
    .bind(barber.id)
    .bind(service.id)
    .bind(start_at)
    .bind(end_at)
    .bind(&name)
    .bind(&phone)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_conflict_violation(&e) {
            AppError::Conflict(SLOT_TAKEN.into())
        } else {
            AppError::Database(e)
        }
    })?;

    // Best-effort attempt record; failure never fails the booking itself.
    if let Err(e) =
        sqlx::query("INSERT INTO appointment_attempts (id, origin) VALUES (gen_random_uuid(), $1)")
            .bind(origin)
            .execute(pool)
            .await
    {
        tracing::warn!("Failed to record booking attempt for {}: {}", origin, e);
    }

    Ok(booked)
}

fn normalize_phone(raw: &str) -> String {
    raw.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_normalization_strips_all_whitespace() {
        assert_eq!(normalize_phone(" +90 555 123 45 67 "), "+905551234567");
        assert_eq!(normalize_phone("0555\t123\n4567"), "05551234567");
        assert_eq!(normalize_phone("05551234567"), "05551234567");
    }

    #[test]
    fn normalized_phone_length_counts_characters() {
        // Nine digits spread over whitespace still fail the minimum.
        assert!(normalize_phone("5 5 5 1 2 3 4 5 6").chars().count() < 10);
        assert!(normalize_phone("+90 555 123 4567").chars().count() >= 10);
    }
}
