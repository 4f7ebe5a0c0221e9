use axum::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound mail collaborator. Delivery is fire-and-forget: callers log a
/// send failure and carry on.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, to: &str, link: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
            .credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: cfg.from.clone(),
        })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()> {
        self.send(
            to,
            "Verify your email",
            format!("Follow this link to verify your email: {link}"),
        )
        .await
    }

    async fn send_password_reset(&self, to: &str, link: &str) -> anyhow::Result<()> {
        self.send(
            to,
            "Reset your password",
            format!("Follow this link to reset your password: {link}"),
        )
        .await
    }
}

/// Fallback used when SMTP is not configured: logs the link instead of
/// delivering it. Handy for local development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &str, link: &str) -> anyhow::Result<()> {
        info!(%to, %link, "verification email (log mailer)");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, link: &str) -> anyhow::Result<()> {
        info!(%to, %link, "password reset email (log mailer)");
        Ok(())
    }
}
