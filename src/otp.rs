//! Signup OTP ledger: one live 6-digit code per email. A re-issue
//! overwrites the previous entry, so the old code stops verifying the
//! moment a new one is requested. Verification attempts are unlimited
//! until expiry.

use axum::async_trait;
use rand::{rngs::OsRng, Rng};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, FromRow)]
pub struct SignupOtp {
    pub email: String,
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl SignupOtp {
    /// A submitted code is accepted iff it equals the stored code (compared
    /// as opaque strings) and `now <= expires_at`.
    pub fn accepts(&self, submitted: &str, now: OffsetDateTime) -> bool {
        self.code == submitted && now <= self.expires_at
    }
}

pub fn generate_code() -> String {
    let n = OsRng.gen_range(0..1_000_000u32);
    format!("{n:06}")
}

/// Ledger seam. Handlers hold a trait object so tests can swap in an
/// in-memory double.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Upserts a fresh code for `email`, replacing any prior entry (last
    /// write wins). Returns the code so the caller can deliver it
    /// out-of-band.
    async fn issue(&self, email: &str, ttl_seconds: i64) -> anyhow::Result<String>;
    async fn lookup(&self, email: &str) -> anyhow::Result<Option<SignupOtp>>;
    /// Idempotent; a no-op when no entry exists.
    async fn delete(&self, email: &str) -> anyhow::Result<()>;
}

/// Durable ledger in the `signup_otps` table. The upsert is the only
/// serialization point for racing requests.
pub struct PgOtpStore {
    db: PgPool,
}

impl PgOtpStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn issue(&self, email: &str, ttl_seconds: i64) -> anyhow::Result<String> {
        // Opportunistic sweep; expired rows are also rejected on read.
        sqlx::query("DELETE FROM signup_otps WHERE expires_at < now()")
            .execute(&self.db)
            .await?;

        let code = generate_code();
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(ttl_seconds);
        sqlx::query(
            r#"
            INSERT INTO signup_otps (email, code, expires_at, created_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (email)
            DO UPDATE SET code = EXCLUDED.code,
                          expires_at = EXCLUDED.expires_at,
                          created_at = EXCLUDED.created_at
            "#,
        )
        .bind(email)
        .bind(&code)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(code)
    }

    async fn lookup(&self, email: &str) -> anyhow::Result<Option<SignupOtp>> {
        let record = sqlx::query_as::<_, SignupOtp>(
            r#"
            SELECT email, code, expires_at, created_at
            FROM signup_otps
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn delete(&self, email: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM signup_otps WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Test double with the same last-write-wins semantics as the table.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryOtpStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, SignupOtp>>,
}

#[cfg(test)]
#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn issue(&self, email: &str, ttl_seconds: i64) -> anyhow::Result<String> {
        let code = generate_code();
        let now = OffsetDateTime::now_utc();
        let entry = SignupOtp {
            email: email.to_string(),
            code: code.clone(),
            expires_at: now + Duration::seconds(ttl_seconds),
            created_at: now,
        };
        self.entries
            .lock()
            .unwrap()
            .insert(email.to_string(), entry);
        Ok(code)
    }

    async fn lookup(&self, email: &str) -> anyhow::Result<Option<SignupOtp>> {
        Ok(self.entries.lock().unwrap().get(email).cloned())
    }

    async fn delete(&self, email: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(email);
        Ok(())
    }
}
