use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use time::{format_description::well_known::Rfc3339, Date, Duration, Time};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::barber::{Barber, Service},
    slots::{self, TimeRange},
};

#[derive(Debug, serde::Deserialize)]
pub struct SlotsQuery {
    pub barber_slug: String,
    pub service_id: Uuid,
    pub date: String,
}

/// Available start instants for one barber, service and day: the generated
/// grid minus booked appointments minus closed overrides.
pub async fn list(
    State(pool): State<PgPool>,
    Query(q): Query<SlotsQuery>,
) -> Result<Json<serde_json::Value>> {
    let date = Date::parse(&q.date, super::DATE_FORMAT)
        .map_err(|_| AppError::BadRequest("date must be YYYY-MM-DD".into()))?;

    let barber = sqlx::query_as::<_, Barber>(
        "SELECT id, slug, name, open_time, close_time, slot_minutes, utc_offset_minutes, \
         is_active, admin_secret, created_at, updated_at \
         FROM barbers WHERE slug = $1 AND is_active = TRUE",
    )
    .bind(&q.barber_slug)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Barber not found".into()))?;

    let service = sqlx::query_as::<_, Service>(
        "SELECT id, barber_id, name, duration_minutes, price_cents, created_at \
         FROM services WHERE id = $1 AND barber_id = $2",
    )
    .bind(q.service_id)
    .bind(barber.id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Service not found".into()))?;

    let offset = barber.utc_offset();
    let day_start = slots::to_instant(date, Time::MIDNIGHT, offset);
    let day_end = day_start + Duration::days(1);

    // Booked intervals touching the barber-local day window.
    let booked = sqlx::query_as::<_, TimeRange>(
        "SELECT start_at, end_at FROM appointments \
         WHERE barber_id = $1 AND status = 'booked' AND start_at < $2 AND end_at > $3",
    )
    .bind(barber.id)
    .bind(day_end)
    .bind(day_start)
    .fetch_all(&pool)
    .await?;

    let closed = sqlx::query_as::<_, TimeRange>(
        "SELECT start_at, end_at FROM availability_overrides \
         WHERE barber_id = $1 AND kind = 'closed'",
    )
    .bind(barber.id)
    .fetch_all(&pool)
    .await?;

    let open = slots::remove_blocked(
        slots::remove_blocked(slots::generate_slots(&barber, &service, date), &booked),
        &closed,
    );
    let starts = open
        .iter()
        .map(|s| s.start_at.format(&Rfc3339))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to format slot: {}", e)))?;

    Ok(Json(json!({ "slots": starts })))
}
