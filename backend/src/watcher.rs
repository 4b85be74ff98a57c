use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::appointment::AppointmentStatus;

/// LISTEN/NOTIFY channel fed by the insert trigger on `appointments`.
pub const NOTIFY_CHANNEL: &str = "appointment_created";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(25);
const POLL_LIMIT: i64 = 5;

/// Notification raised to the admin surface for one fresh booking.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    pub customer_name: String,
}

/// Wire payload emitted by the `appointment_created` trigger.
#[derive(Debug, Deserialize)]
struct AppointmentEvent {
    barber_id: Uuid,
    status: AppointmentStatus,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    start_at: OffsetDateTime,
    customer_name: String,
}

enum PushOutcome {
    Cancelled,
    Degraded,
}

/// Watches one barber's calendar for new bookings and forwards them as
/// [`NewAppointment`] events.
///
/// Push delivery over LISTEN/NOTIFY is preferred; if the subscription cannot
/// be established or the stream errors out, the watcher degrades to polling
/// for the rest of its life. A monotonic `created_at` baseline, taken before
/// either mode starts, filters out pre-existing rows, duplicates and
/// out-of-order delivery.
pub struct NotificationWatcher {
    pool: PgPool,
    barber_id: Uuid,
    events: mpsc::Sender<NewAppointment>,
    shutdown: CancellationToken,
    poll_interval: Duration,
    push_enabled: bool,
    baseline: Option<OffsetDateTime>,
}

impl NotificationWatcher {
    pub fn new(
        pool: PgPool,
        barber_id: Uuid,
        events: mpsc::Sender<NewAppointment>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            barber_id,
            events,
            shutdown,
            poll_interval: DEFAULT_POLL_INTERVAL,
            push_enabled: true,
            baseline: None,
        }
    }

    /// Overrides the poll cadence (tests use a short one).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Skips push delivery entirely, e.g. behind a pooling proxy where
    /// LISTEN/NOTIFY does not reach the session.
    pub fn poll_only(mut self) -> Self {
        self.push_enabled = false;
        self
    }

    /// Runs until the shutdown token fires or the event receiver is dropped.
    pub async fn run(mut self) {
        match self.latest_created_at().await {
            Ok(baseline) => self.baseline = baseline,
            Err(e) => tracing::warn!("Failed to read notification baseline: {}", e),
        }

        if self.push_enabled {
            match self.push_loop().await {
                PushOutcome::Cancelled => return,
                PushOutcome::Degraded => {
                    tracing::warn!(
                        "Push notifications unavailable for barber {}, polling every {:?}",
                        self.barber_id,
                        self.poll_interval
                    );
                }
            }
        }
        self.poll_loop().await;
    }

    /// Most recent booked `created_at` for the barber, the notification
    /// baseline. `None` when the calendar has no booked rows yet.
    async fn latest_created_at(&self) -> Result<Option<OffsetDateTime>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT created_at FROM appointments \
             WHERE barber_id = $1 AND status = 'booked' \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(self.barber_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn push_loop(&mut self) -> PushOutcome {
        let mut listener = match PgListener::connect_with(&self.pool).await {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!("Notification listener failed to connect: {}", e);
                return PushOutcome::Degraded;
            }
        };
        if let Err(e) = listener.listen(NOTIFY_CHANNEL).await {
            tracing::warn!("LISTEN {} failed: {}", NOTIFY_CHANNEL, e);
            return PushOutcome::Degraded;
        }

        loop {
            let payload = tokio::select! {
                _ = self.shutdown.cancelled() => return PushOutcome::Cancelled,
                _ = self.events.closed() => return PushOutcome::Cancelled,
                received = listener.recv() => match received {
                    Ok(notification) => notification.payload().to_string(),
                    Err(e) => {
                        tracing::warn!("Notification stream lost: {}", e);
                        return PushOutcome::Degraded;
                    }
                },
            };
            if !self.handle_push_payload(&payload).await {
                return PushOutcome::Cancelled;
            }
        }
    }

    /// Returns false once the receiving side is gone.
    async fn handle_push_payload(&mut self, payload: &str) -> bool {
        let event: AppointmentEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Ignoring malformed appointment event: {}", e);
                return true;
            }
        };
        if event.barber_id != self.barber_id || event.status != AppointmentStatus::Booked {
            return true;
        }
        if !should_emit(self.baseline, event.created_at) {
            return true;
        }
        self.baseline = Some(event.created_at);
        self.events
            .send(NewAppointment {
                start_at: event.start_at,
                customer_name: event.customer_name,
            })
            .await
            .is_ok()
    }

    async fn poll_loop(&mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = self.events.closed() => return,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
            if !self.poll_once().await {
                return;
            }
        }
    }

    /// Returns false once the receiving side is gone.
    async fn poll_once(&mut self) -> bool {
        let rows: Vec<PolledAppointment> = match sqlx::query_as(
            "SELECT created_at, start_at, customer_name FROM appointments \
             WHERE barber_id = $1 AND status = 'booked' \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(self.barber_id)
        .bind(POLL_LIMIT)
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Notification poll failed: {}", e);
                return true;
            }
        };

        let Some(latest) = rows.first() else {
            return true;
        };
        let Some(baseline) = self.baseline else {
            // First sight of the calendar: record, never replay old rows.
            self.baseline = Some(latest.created_at);
            return true;
        };
        if latest.created_at > baseline {
            self.baseline = Some(latest.created_at);
            return self
                .events
                .send(NewAppointment {
                    start_at: latest.start_at,
                    customer_name: latest.customer_name.clone(),
                })
                .await
                .is_ok();
        }
        true
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PolledAppointment {
    created_at: OffsetDateTime,
    start_at: OffsetDateTime,
    customer_name: String,
}

/// A push event advances the baseline only when strictly newer; with no
/// baseline yet, any event counts.
fn should_emit(baseline: Option<OffsetDateTime>, created_at: OffsetDateTime) -> bool {
    baseline.map_or(true, |b| created_at > b)
}
