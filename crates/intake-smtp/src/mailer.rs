//! # SMTP Mailer
//!
//! `Mailer` implementation over an authenticated lettre SMTP transport.

use crate::config::SmtpConfig;
use async_trait::async_trait;
use intake_core::{EmailMessage, IntakeError, IntakeResult, Mailer};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use tracing::{debug, error, info};

const SERVICE: &str = "smtp";

/// Sends plain-text mail through the configured relay
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: &SmtpConfig) -> IntakeResult<Self> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let builder = if config.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| IntakeError::Configuration(format!("SMTP relay {}: {e}", config.host)))?;

        let transport = builder
            .port(config.port)
            .credentials(credentials)
            .build();

        debug!(host = %config.host, port = config.port, "SMTP transport ready");
        Ok(Self { transport })
    }

    pub fn from_env() -> IntakeResult<Self> {
        Self::new(&SmtpConfig::from_env()?)
    }
}

fn mailbox(address: &str) -> IntakeResult<Mailbox> {
    address
        .parse()
        .map_err(|_| IntakeError::validation(format!("Invalid email address: {address}")))
}

/// Render an `EmailMessage` as a plain-text MIME message
pub(crate) fn build_message(message: &EmailMessage) -> IntakeResult<Message> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .to(mailbox(&message.to)?)
        .subject(message.subject.as_str());

    if let Some(ref reply_to) = message.reply_to {
        builder = builder.reply_to(mailbox(reply_to)?);
    }

    builder
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| IntakeError::Internal(format!("Failed to build message: {e}")))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> IntakeResult<()> {
        let email = build_message(message)?;

        self.transport.send(email).await.map_err(|e| {
            error!(to = %message.to, error = %e, "SMTP send failed");
            IntakeError::upstream(SERVICE, e.to_string())
        })?;

        info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(reply_to: Option<&str>) -> EmailMessage {
        EmailMessage {
            to: "inbox@example.com".to_string(),
            from: "shop@example.com".to_string(),
            reply_to: reply_to.map(str::to_string),
            subject: "New event inquiry: Robin (2026-11-14)".to_string(),
            body: "Guests: 4".to_string(),
        }
    }

    #[test]
    fn test_build_message_headers() {
        let email = build_message(&message(Some("robin@example.com"))).unwrap();
        let raw = String::from_utf8_lossy(&email.formatted()).to_string();

        assert!(raw.contains("From: shop@example.com"));
        assert!(raw.contains("To: inbox@example.com"));
        assert!(raw.contains("Reply-To: robin@example.com"));
        assert!(raw.contains("Subject: New event inquiry: Robin (2026-11-14)"));
        assert!(raw.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(raw.contains("Guests: 4"));
    }

    #[test]
    fn test_build_message_without_reply_to() {
        let email = build_message(&message(None)).unwrap();
        let raw = String::from_utf8_lossy(&email.formatted()).to_string();
        assert!(!raw.contains("Reply-To"));
    }

    #[test]
    fn test_invalid_recipient() {
        let mut bad = message(None);
        bad.to = "not an address".to_string();

        let err = build_message(&bad).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Invalid email address: not an address");
    }

    #[tokio::test]
    async fn test_transport_builds_for_both_modes() {
        let implicit = SmtpConfig::new("shop@example.com", "pw");
        assert!(SmtpMailer::new(&implicit).is_ok());

        let starttls = implicit.with_relay("smtp.example.com", 587);
        assert!(SmtpMailer::new(&starttls).is_ok());
    }
}
