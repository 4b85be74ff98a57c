use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::Type)]
#[sqlx(type_name = "override_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    Closed,
}

/// Ad-hoc closed interval layered over the barber's standing hours.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AvailabilityOverride {
    pub id: Uuid,
    pub barber_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    pub kind: OverrideKind,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOverrideRequest {
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    #[validate(length(max = 500, message = "note must be at most 500 characters"))]
    pub note: Option<String>,
}
