use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, Query},
    http::{request::Parts, HeaderMap},
};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::barber::Barber;
use crate::AppState;

/// Barber resolved from the admin capability pair: routing slug plus the
/// admin secret, passed as `?key=` or the `x-admin-secret` header.
pub struct AdminBarber(pub Barber);

#[derive(Debug, Deserialize)]
struct AdminAuthParams {
    barber_slug: Option<String>,
    key: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminBarber
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Query(params) = Query::<AdminAuthParams>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::BadRequest("barber_slug is required".into()))?;

        let slug = params
            .barber_slug
            .ok_or_else(|| AppError::BadRequest("barber_slug is required".into()))?;
        let secret = params
            .key
            .or_else(|| header_value(&parts.headers, "x-admin-secret"))
            .ok_or(AppError::Unauthorized)?;

        let barber = sqlx::query_as::<_, Barber>(
            "SELECT id, slug, name, open_time, close_time, slot_minutes, utc_offset_minutes, \
             is_active, admin_secret, created_at, updated_at \
             FROM barbers WHERE slug = $1 AND admin_secret = $2",
        )
        .bind(&slug)
        .bind(&secret)
        .fetch_optional(&app_state.pool)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Admin auth check failed: {}", e)))?
        .ok_or(AppError::Unauthorized)?;

        Ok(AdminBarber(barber))
    }
}

/// Requesting origin used for abuse throttling. Proxy headers are trusted
/// in order and spoofable; never used for authorization.
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(&parts.headers)))
    }
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_the_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers), "198.51.100.4");
    }

    #[test]
    fn empty_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers), "198.51.100.4");
    }

    #[test]
    fn unknown_when_no_headers_present() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
