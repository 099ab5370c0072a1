//! Email delivery via SMTP.
//!
//! Wraps the `lettre` async SMTP transport. Configuration comes from
//! environment variables; if `SMTP_HOST` is not set, [`EmailConfig::from_env`]
//! returns `None` and the email channel should not be wired up.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use habita_core::notification::Notification;
use habita_core::preferences::PersonalizationFacts;

use super::{Delivery, SendError, Sender};

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "notificaciones@habita.local";

/// SMTP configuration for the email channel.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable        | Required | Default                       |
    /// |-----------------|----------|-------------------------------|
    /// | `SMTP_HOST`     | yes      | —                             |
    /// | `SMTP_PORT`     | no       | `587`                         |
    /// | `SMTP_FROM`     | no       | `notificaciones@habita.local` |
    /// | `SMTP_USER`     | no       | —                             |
    /// | `SMTP_PASSWORD` | no       | —                             |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

/// Sends notification emails over SMTP.
pub struct EmailSender {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailSender {
    pub fn new(config: EmailConfig) -> Result<Self, SendError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let transport = builder.build();
        Ok(Self { config, transport })
    }
}

#[async_trait]
impl Sender for EmailSender {
    fn channel(&self) -> habita_core::channel::Channel {
        habita_core::channel::Channel::Email
    }

    async fn send(
        &self,
        notification: &Notification,
        facts: &PersonalizationFacts,
    ) -> Result<Delivery, SendError> {
        let to = facts
            .email
            .as_deref()
            .ok_or(SendError::MissingContact("email address"))?;

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to.parse()?)
            .subject(notification.title.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())?;

        self.transport.send(email).await?;

        tracing::info!(
            notification_id = notification.id,
            event_kind = notification.event.as_str(),
            "Notification email sent"
        );
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn missing_contact_error_display() {
        let err = SendError::MissingContact("email address");
        assert_eq!(err.to_string(), "No email address on file for user");
    }
}
