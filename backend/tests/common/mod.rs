#![allow(dead_code)]
use std::net::SocketAddr;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use trimly_backend::{api, AppState};

/// Spin up a real Axum server on a random port, returning its address and
/// the database pool. Returns `None` (callers skip the test) when
/// `TEST_DATABASE_URL` is unset, so the pure-logic suite still runs without
/// a database. Tests share one database; isolation comes from unique
/// barbers/phones/origins per test plus cleanup afterwards.
pub async fn setup_test_app() -> Option<(SocketAddr, PgPool)> {
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping: TEST_DATABASE_URL is not set");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    // Run migrations to ensure schema is up-to-date
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState {
        pool: pool.clone(),
        notify_poll: Duration::from_millis(200),
    };

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some((addr, pool))
}

pub struct TestBarber {
    pub id: Uuid,
    pub slug: String,
    pub admin_secret: String,
}

/// Create a barber open 09:00-18:00 on a 30-minute grid at UTC offset 0,
/// with a unique slug and admin secret.
pub async fn create_test_barber(pool: &PgPool, suffix: &str) -> TestBarber {
    let id = Uuid::new_v4();
    let slug = format!("test-barber-{}-{}", suffix, &id.to_string()[..8]);
    let admin_secret = format!("secret-{}", Uuid::new_v4());

    sqlx::query(
        "INSERT INTO barbers (id, slug, name, open_time, close_time, slot_minutes, \
                              utc_offset_minutes, is_active, admin_secret) \
         VALUES ($1, $2, $3, '09:00', '18:00', 30, 0, TRUE, $4)",
    )
    .bind(id)
    .bind(&slug)
    .bind(format!("Test Barber {}", suffix))
    .bind(&admin_secret)
    .execute(pool)
    .await
    .expect("Failed to create test barber");

    TestBarber {
        id,
        slug,
        admin_secret,
    }
}

/// Create a service for the barber. Returns the service ID.
pub async fn create_test_service(pool: &PgPool, barber_id: Uuid, duration_minutes: i32) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO services (id, barber_id, name, duration_minutes, price_cents) \
         VALUES ($1, $2, $3, $4, 30000)",
    )
    .bind(id)
    .bind(barber_id)
    .bind(format!("Cut {}m", duration_minutes))
    .bind(duration_minutes)
    .execute(pool)
    .await
    .expect("Failed to create test service");
    id
}

/// Insert an appointment row directly, bypassing the admission controller.
pub async fn insert_appointment(
    pool: &PgPool,
    barber_id: Uuid,
    service_id: Uuid,
    start_at: OffsetDateTime,
    end_at: OffsetDateTime,
    customer_name: &str,
    status: &str,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO appointments (id, barber_id, service_id, start_at, end_at, \
                                   customer_name, customer_phone, status) \
         VALUES ($1, $2, $3, $4, $5, $6, '+905550000000', $7::appointment_status)",
    )
    .bind(id)
    .bind(barber_id)
    .bind(service_id)
    .bind(start_at)
    .bind(end_at)
    .bind(customer_name)
    .bind(status)
    .execute(pool)
    .await
    .expect("Failed to insert appointment");
    id
}

/// Book through the HTTP API with an explicit origin so rate-limit counters
/// never leak between tests.
pub async fn post_booking(
    client: &reqwest::Client,
    addr: SocketAddr,
    origin: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("http://{}/api/appointments", addr))
        .header("x-forwarded-for", origin)
        .json(&body)
        .send()
        .await
        .expect("Booking request failed")
}

/// A calendar date `days` ahead of today, formatted `YYYY-MM-DD`.
pub fn future_date(days: i64) -> String {
    format_date(OffsetDateTime::now_utc().date() + time::Duration::days(days))
}

pub fn format_date(date: time::Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Build a reqwest client (reusable across requests in a test).
pub fn http_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Clean up all data hanging off a test barber.
pub async fn cleanup_test_barber(pool: &PgPool, barber_id: Uuid) {
    let cleanup_queries = [
        "DELETE FROM appointments WHERE barber_id = $1",
        "DELETE FROM availability_overrides WHERE barber_id = $1",
        "DELETE FROM services WHERE barber_id = $1",
        "DELETE FROM barbers WHERE id = $1",
    ];
    for q in cleanup_queries {
        let _ = sqlx::query(q).bind(barber_id).execute(pool).await;
    }
}

/// Clean up rate-limit counters for one origin.
pub async fn cleanup_attempts(pool: &PgPool, origin: &str) {
    let _ = sqlx::query("DELETE FROM appointment_attempts WHERE origin = $1")
        .bind(origin)
        .execute(pool)
        .await;
}
