use serde::Serialize;
use time::{OffsetDateTime, Time, UtcOffset};
use uuid::Uuid;

/// Full barber record as stored in the database.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Barber {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub open_time: Time,
    pub close_time: Time,
    pub slot_minutes: i32,
    pub utc_offset_minutes: i32,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub admin_secret: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Barber {
    /// The barber's fixed timezone offset. No DST rules apply.
    pub fn utc_offset(&self) -> UtcOffset {
        // Schema bounds the offset to +/-14h, well within UtcOffset's domain.
        UtcOffset::from_whole_seconds(self.utc_offset_minutes * 60).unwrap_or(UtcOffset::UTC)
    }
}

/// Subset returned to clients (no admin secret, no scheduling internals).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BarberPublic {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub barber_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price_cents: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Subset listed on the public booking page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServicePublic {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price_cents: Option<i64>,
}
