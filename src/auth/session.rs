//! Stateless cookie sessions: the session payload `{user_id, username}`
//! travels in an HS256-signed token, carried in an `HttpOnly` cookie (a
//! bearer Authorization header is also accepted).

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap, HeaderValue},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "roomcraft_session";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    cookie_secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let session = &state.config.session;
        Self {
            encoding: EncodingKey::from_secret(session.secret.as_bytes()),
            decoding: DecodingKey::from_secret(session.secret.as_bytes()),
            issuer: session.issuer.clone(),
            audience: session.audience.clone(),
            ttl: Duration::from_secs((session.ttl_minutes.max(0) as u64) * 60),
            cookie_secure: session.cookie_secure,
        }
    }
}

impl SessionKeys {
    pub fn sign(&self, user_id: Uuid, username: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = SessionClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// `HttpOnly` session cookie carrying the signed token.
    pub fn cookie(&self, token: &str) -> anyhow::Result<HeaderValue> {
        let max_age = self.ttl.as_secs();
        let mut cookie =
            format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }

    pub fn clear_cookie(&self) -> anyhow::Result<HeaderValue> {
        let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }
}

pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Session payload attached to a request.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Guard for protected routes; rejects with 401 when no valid session
/// cookie or bearer token is attached.
pub struct AuthSession(pub SessionUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let token = extract_session_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;
        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Unauthenticated
        })?;
        Ok(AuthSession(SessionUser {
            user_id: claims.sub,
            username: claims.username,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> SessionKeys {
        let state = AppState::fake();
        SessionKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "alice").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let token = keys.sign(Uuid::new_v4(), "alice").expect("sign");
        let mut tampered = token.clone();
        tampered.pop();
        assert!(keys.verify(&tampered).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_token_signed_with_other_secret() {
        let keys = make_keys();
        let other = SessionKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl: Duration::from_secs(300),
            cookie_secure: false,
        };
        let token = other.sign(Uuid::new_v4(), "mallory").expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_audience() {
        let keys = make_keys();
        let other = SessionKeys {
            encoding: EncodingKey::from_secret(b"test-secret"),
            decoding: DecodingKey::from_secret(b"test-secret"),
            issuer: "test-issuer".into(),
            audience: "someone-else".into(),
            ttl: Duration::from_secs(300),
            cookie_secure: false,
        };
        let token = other.sign(Uuid::new_v4(), "alice").expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn cookie_is_http_only_and_scoped() {
        let keys = make_keys();
        let cookie = keys.cookie("tok123").expect("cookie");
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("roomcraft_session=tok123;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Max-Age=300"));
        assert!(!value.contains("Secure"));
    }

    #[tokio::test]
    async fn clear_cookie_expires_immediately() {
        let keys = make_keys();
        let cookie = keys.clear_cookie().expect("cookie");
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("roomcraft_session=;"));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn token_extraction_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; roomcraft_session=tok123; lang=en"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn token_extraction_prefers_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer bear-tok"),
        );
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("roomcraft_session=cookie-tok"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("bear-tok"));
    }

    #[tokio::test]
    async fn extractor_rejects_request_without_session() {
        let state = AppState::fake();
        let request = axum::http::Request::builder().body(()).unwrap();
        let (mut parts, ()) = request.into_parts();
        let err = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn extractor_accepts_valid_session_cookie() {
        let state = AppState::fake();
        let keys = SessionKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "alice").expect("sign");
        let request = axum::http::Request::builder()
            .header(
                axum::http::header::COOKIE,
                format!("{SESSION_COOKIE}={token}"),
            )
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let AuthSession(session) = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .expect("should accept");
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.username, "alice");
    }

    #[tokio::test]
    async fn extractor_rejects_garbage_cookie() {
        let state = AppState::fake();
        let request = axum::http::Request::builder()
            .header(
                axum::http::header::COOKIE,
                format!("{SESSION_COOKIE}=not-a-token"),
            )
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let err = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("should reject");
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[test]
    fn token_extraction_returns_none_without_session() {
        let headers = HeaderMap::new();
        assert!(extract_session_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark"),
        );
        assert!(extract_session_token(&headers).is_none());
    }
}
