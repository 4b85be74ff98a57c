use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use sqlx::PgPool;
use time::{format_description::well_known::Rfc3339, Date, Duration, OffsetDateTime, Time};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AdminBarber,
    error::{AppError, Result},
    ics,
    models::appointment::{
        AdminAppointment, Appointment, AppointmentStatus, BookedAppointment,
        UpdateAppointmentRequest,
    },
    models::barber::BarberPublic,
    models::overrides::{AvailabilityOverride, CreateOverrideRequest},
    slots::to_instant,
    watcher::{NewAppointment, NotificationWatcher},
    AppState,
};

#[derive(Debug, serde::Deserialize)]
pub struct VerifyRequest {
    pub barber_slug: String,
    pub admin_secret: String,
}

/// Checks an admin capability pair without a side effect, so the admin view
/// can gate itself before loading anything.
pub async fn verify(
    State(pool): State<PgPool>,
    Json(body): Json<VerifyRequest>,
) -> Result<Response> {
    let found = sqlx::query_as::<_, BarberPublic>(
        "SELECT id, slug, name FROM barbers WHERE slug = $1 AND admin_secret = $2",
    )
    .bind(&body.barber_slug)
    .bind(&body.admin_secret)
    .fetch_optional(&pool)
    .await?;

    Ok(match found {
        Some(barber) => Json(json!({
            "valid": true,
            "barber_id": barber.id,
            "barber_name": barber.name,
        }))
        .into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(json!({ "valid": false }))).into_response(),
    })
}

#[derive(Debug, serde::Deserialize)]
pub struct AdminDayQuery {
    pub date: Option<String>,
}

/// One local day of appointments, service details joined in. Defaults to
/// today in the barber's offset.
pub async fn list_appointments(
    State(pool): State<PgPool>,
    AdminBarber(barber): AdminBarber,
    Query(q): Query<AdminDayQuery>,
) -> Result<Json<serde_json::Value>> {
    let offset = barber.utc_offset();
    let date = match q.date {
        Some(raw) => Date::parse(&raw, super::DATE_FORMAT)
            .map_err(|_| AppError::BadRequest("date must be YYYY-MM-DD".into()))?,
        None => OffsetDateTime::now_utc().to_offset(offset).date(),
    };
    let day_start = to_instant(date, Time::MIDNIGHT, offset);
    let day_end = day_start + Duration::days(1);

    let appointments = sqlx::query_as::<_, AdminAppointment>(
        "SELECT a.id, a.start_at, a.end_at, a.customer_name, a.customer_phone, \
                a.status, a.created_at, \
                s.name AS service_name, s.duration_minutes AS service_duration_minutes \
         FROM appointments a \
         LEFT JOIN services s ON s.id = a.service_id \
         WHERE a.barber_id = $1 AND a.start_at >= $2 AND a.start_at < $3 \
         ORDER BY a.start_at",
    )
    .bind(barber.id)
    .bind(day_start)
    .bind(day_end)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "appointments": appointments })))
}

/// Cancels a booking. The status guard makes the transition one-way and
/// keeps a second cancel from looking like a success.
pub async fn update_appointment(
    State(pool): State<PgPool>,
    AdminBarber(barber): AdminBarber,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAppointmentRequest>,
) -> Result<Json<serde_json::Value>> {
    if body.status != AppointmentStatus::Cancelled {
        return Err(AppError::BadRequest("status must be 'cancelled'".into()));
    }

    let appointment = sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET status = 'cancelled' \
         WHERE id = $1 AND barber_id = $2 AND status = 'booked' \
         RETURNING id, barber_id, service_id, start_at, end_at, \
                   customer_name, customer_phone, status, created_at",
    )
    .bind(id)
    .bind(barber.id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Appointment not found or already cancelled".into()))?;

    Ok(Json(json!({ "appointment": appointment })))
}

/// `text/calendar` export of one appointment.
pub async fn appointment_ics(
    State(pool): State<PgPool>,
    AdminBarber(barber): AdminBarber,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let appointment = sqlx::query_as::<_, BookedAppointment>(
        "SELECT id, start_at, end_at, customer_name, customer_phone \
         FROM appointments WHERE id = $1 AND barber_id = $2",
    )
    .bind(id)
    .bind(barber.id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Appointment not found".into()))?;

    let body = ics::render_ics(
        appointment.start_at,
        appointment.end_at,
        &appointment.customer_name,
        &appointment.customer_phone,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to render calendar file: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"appointment.ics\"",
            ),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, serde::Deserialize)]
pub struct OverridesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list_overrides(
    State(pool): State<PgPool>,
    AdminBarber(barber): AdminBarber,
    Query(q): Query<OverridesQuery>,
) -> Result<Json<serde_json::Value>> {
    let from = parse_instant(q.from.as_deref(), "from")?;
    let to = parse_instant(q.to.as_deref(), "to")?;

    let overrides = sqlx::query_as::<_, AvailabilityOverride>(
        "SELECT id, barber_id, start_at, end_at, kind, note, created_at \
         FROM availability_overrides \
         WHERE barber_id = $1 \
           AND ($2::timestamptz IS NULL OR start_at >= $2) \
           AND ($3::timestamptz IS NULL OR end_at <= $3) \
         ORDER BY start_at",
    )
    .bind(barber.id)
    .bind(from)
    .bind(to)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "overrides": overrides })))
}

pub async fn create_override(
    State(pool): State<PgPool>,
    AdminBarber(barber): AdminBarber,
    Json(body): Json<CreateOverrideRequest>,
) -> Result<Json<serde_json::Value>> {
    body.validate()?;
    if body.end_at <= body.start_at {
        return Err(AppError::BadRequest("end_at must be after start_at".into()));
    }

    let created = sqlx::query_as::<_, AvailabilityOverride>(
        "INSERT INTO availability_overrides (id, barber_id, start_at, end_at, kind, note) \
         VALUES ($1, $2, $3, $4, 'closed', $5) \
         RETURNING id, barber_id, start_at, end_at, kind, note, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(barber.id)
    .bind(body.start_at)
    .bind(body.end_at)
    .bind(&body.note)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({ "override": created })))
}

fn parse_instant(raw: Option<&str>, field: &str) -> Result<Option<OffsetDateTime>> {
    match raw {
        None => Ok(None),
        Some(raw) => OffsetDateTime::parse(raw, &Rfc3339)
            .map(Some)
            .map_err(|_| {
                AppError::BadRequest(format!("{} must be a valid RFC 3339 timestamp", field))
            }),
    }
}

// -- Notifications --

/// Live feed of fresh bookings for the admin view. Upgrades to a WebSocket
/// and streams one JSON frame per new appointment.
pub async fn notifications_ws(
    State(state): State<AppState>,
    AdminBarber(barber): AdminBarber,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    Ok(ws.on_upgrade(move |socket| notification_session(socket, state, barber.id)))
}

async fn notification_session(socket: WebSocket, state: AppState, barber_id: Uuid) {
    let (events_tx, mut events_rx) = mpsc::channel::<NewAppointment>(16);
    let shutdown = CancellationToken::new();
    let watcher = NotificationWatcher::new(state.pool.clone(), barber_id, events_tx, shutdown.clone())
        .poll_interval(state.notify_poll);
    let watcher_task = tokio::spawn(watcher.run());

    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                let frame = match serde_json::to_string(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!("Failed to encode notification: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    // Ignore pings and client chatter, stop on close or error.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    shutdown.cancel();
    if let Err(e) = watcher_task.await {
        tracing::error!("Notification watcher task failed: {}", e);
    }
}
