use axum::{extract::State, Json};
use serde_json::json;
use sqlx::PgPool;

use crate::{auth::ClientIp, booking, error::Result, models::appointment::CreateAppointmentRequest};

/// Books one appointment. Validation order, abuse caps and the race-safe
/// insert all live in [`booking::create`].
pub async fn create(
    State(pool): State<PgPool>,
    ClientIp(origin): ClientIp,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<Json<serde_json::Value>> {
    let booked = booking::create(&pool, &origin, body).await?;
    Ok(Json(json!({
        "appointment": booked,
        "message": "Your appointment is booked.",
    })))
}
