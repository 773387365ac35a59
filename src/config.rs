use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct ProviderMailConfig {
    pub api_url: String,
    pub api_key: String,
    pub template_id: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_address: String,
    pub provider: Option<ProviderMailConfig>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub mail: MailConfig,
    pub wallpapers_dir: PathBuf,
    pub otp_ttl_seconds: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "roomcraft".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "roomcraft-users".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
            cookie_secure: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        let provider = std::env::var("MAIL_API_KEY").ok().map(|api_key| {
            ProviderMailConfig {
                api_url: std::env::var("MAIL_API_URL")
                    .unwrap_or_else(|_| "https://api.mailersend.com/v1/email".into()),
                api_key,
                template_id: std::env::var("MAIL_TEMPLATE_ID").unwrap_or_default(),
            }
        });
        let smtp = std::env::var("SMTP_HOST").ok().map(|host| SmtpConfig {
            host,
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
        });
        let mail = MailConfig {
            from_address: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@roomcraft.local".into()),
            provider,
            smtp,
        };

        let wallpapers_dir = std::env::var("WALLPAPERS_DIR")
            .unwrap_or_else(|_| "wallpapers".into())
            .into();
        let otp_ttl_seconds = std::env::var("OTP_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(300);

        Ok(Self {
            database_url,
            session,
            mail,
            wallpapers_dir,
            otp_ttl_seconds,
        })
    }
}
