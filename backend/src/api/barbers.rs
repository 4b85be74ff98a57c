use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    models::barber::{BarberPublic, ServicePublic},
};

/// Public booking-page payload: the barber plus its service menu.
pub async fn get_by_slug(
    State(pool): State<PgPool>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let barber = sqlx::query_as::<_, BarberPublic>(
        "SELECT id, slug, name FROM barbers WHERE slug = $1 AND is_active = TRUE",
    )
    .bind(&slug)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Barber not found".into()))?;

    let services = sqlx::query_as::<_, ServicePublic>(
        "SELECT id, name, duration_minutes, price_cents FROM services \
         WHERE barber_id = $1 ORDER BY name",
    )
    .bind(barber.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "barber": barber, "services": services })))
}
