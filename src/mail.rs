use axum::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;
use tracing::info;

use crate::config::{ProviderMailConfig, SmtpConfig};

/// Outbound email delivery. Best-effort: a failed send surfaces to the
/// caller, who must re-invoke explicitly. No queuing, no retries.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()>;
}

/// Delivers through a templated transactional-email HTTP API.
pub struct ProviderMailer {
    client: reqwest::Client,
    config: ProviderMailConfig,
    from_address: String,
}

impl ProviderMailer {
    pub fn new(config: ProviderMailConfig, from_address: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            from_address,
        }
    }
}

#[async_trait]
impl Mailer for ProviderMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
        let body = json!({
            "from": { "email": self.from_address },
            "to": [{ "email": to }],
            "subject": subject,
            "template_id": self.config.template_id,
            "personalization": [{
                "email": to,
                "data": { "content": text }
            }],
        });
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("mail provider returned {status}: {detail}");
        }
        Ok(())
    }
}

/// Direct SMTP delivery with a plain-text body. Used when no provider
/// credentials are configured.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from_address: String) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?;
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }
        Ok(Self {
            transport: builder.build(),
            from_address,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Local dev sender that logs instead of delivering.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
        info!(%to, %subject, %text, "mail send stub");
        Ok(())
    }
}
