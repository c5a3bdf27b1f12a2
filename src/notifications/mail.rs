use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::db::EmailSetting;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("no active email configuration")]
    NotConfigured,
    #[error("unsupported encryption '{0}', expected tls or ssl")]
    Encryption(String),
    #[error("port {0} is out of range")]
    Port(i64),
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait MailChannel: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;

    /// Replaces the transport configuration; `None` disables delivery.
    async fn configure(&self, settings: Option<&EmailSetting>) -> Result<(), MailError>;
}

struct Transport {
    smtp: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

/// SMTP delivery configured from the active `email_settings` row.
/// Sends hold their own handle on the transport, so reconfiguring never
/// waits on an SMTP round-trip.
pub struct SmtpMailer {
    fallback_from: (String, String),
    transport: RwLock<Option<Arc<Transport>>>,
}

impl SmtpMailer {
    pub fn new(fallback_address: impl Into<String>, fallback_name: impl Into<String>) -> Self {
        Self {
            fallback_from: (fallback_address.into(), fallback_name.into()),
            transport: RwLock::new(None),
        }
    }

    pub async fn is_configured(&self) -> bool {
        self.transport.read().await.is_some()
    }

    fn build_transport(&self, settings: &EmailSetting) -> Result<Transport, MailError> {
        let builder = match settings.mail_encryption.to_ascii_lowercase().as_str() {
            "ssl" => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.mail_host)?,
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.mail_host)?,
            other => return Err(MailError::Encryption(other.to_string())),
        };
        let port = u16::try_from(settings.mail_port)
            .map_err(|_| MailError::Port(settings.mail_port))?;

        let smtp = builder
            .port(port)
            .credentials(Credentials::new(
                settings.mail_username.clone(),
                settings.mail_password.clone(),
            ))
            .build();

        let (address, name) = if settings.mail_from_address.trim().is_empty() {
            self.fallback_from.clone()
        } else {
            (
                settings.mail_from_address.clone(),
                settings.mail_from_name.clone(),
            )
        };
        let from = Mailbox::new(Some(name), address.parse()?);

        Ok(Transport { smtp, from })
    }
}

#[async_trait]
impl MailChannel for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let current = self.transport.read().await.clone();
        let Some(transport) = current else {
            warn!(
                to = %mail.to,
                subject = %mail.subject,
                "email not sent: no active email configuration"
            );
            return Err(MailError::NotConfigured);
        };

        let message = Message::builder()
            .from(transport.from.clone())
            .to(mail.to.parse()?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone())?;

        transport.smtp.send(message).await?;
        info!(to = %mail.to, subject = %mail.subject, "email sent");
        Ok(())
    }

    async fn configure(&self, settings: Option<&EmailSetting>) -> Result<(), MailError> {
        let transport = settings
            .map(|s| self.build_transport(s).map(Arc::new))
            .transpose()?;
        match &transport {
            Some(t) => info!(from = %t.from, "email transport configured"),
            None => info!("email transport cleared"),
        }
        *self.transport.write().await = transport;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn settings(encryption: &str) -> EmailSetting {
        let now = Utc::now();
        EmailSetting {
            id: 1,
            mail_mailer: "smtp".into(),
            mail_host: "smtp.example.org".into(),
            mail_port: 587,
            mail_username: "mailer".into(),
            mail_password: "secret".into(),
            mail_encryption: encryption.into(),
            mail_from_address: "committee@example.org".into(),
            mail_from_name: "Committee".into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn mail() -> OutgoingMail {
        OutgoingMail {
            to: "siti@example.org".into(),
            subject: "Hello".into(),
            html: "<p>hi</p>".into(),
        }
    }

    #[tokio::test]
    async fn unconfigured_mailer_reports_failure() {
        let mailer = SmtpMailer::new("noreply@example.org", "Conference");
        assert!(!mailer.is_configured().await);
        assert!(matches!(mailer.send(&mail()).await, Err(MailError::NotConfigured)));
    }

    #[tokio::test]
    async fn configuration_can_be_applied_and_cleared() {
        let mailer = SmtpMailer::new("noreply@example.org", "Conference");
        mailer.configure(Some(&settings("tls"))).await.unwrap();
        assert!(mailer.is_configured().await);
        mailer.configure(None).await.unwrap();
        assert!(!mailer.is_configured().await);
    }

    #[tokio::test]
    async fn reconfigure_does_not_wait_for_a_stalled_send() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (accepted_tx, accepted_rx) = tokio::sync::oneshot::channel();
        // Accepts the connection and never sends the SMTP greeting.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let _ = accepted_tx.send(());
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            drop(socket);
        });

        let mut stalled = settings("tls");
        stalled.mail_host = "127.0.0.1".into();
        stalled.mail_port = i64::from(port);
        let mailer = Arc::new(SmtpMailer::new("noreply@example.org", "Conference"));
        mailer.configure(Some(&stalled)).await.unwrap();

        let sending = tokio::spawn({
            let mailer = mailer.clone();
            async move { mailer.send(&mail()).await }
        });
        accepted_rx.await.unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(2), mailer.configure(None))
            .await
            .expect("configure blocked behind an in-flight send")
            .unwrap();
        assert!(!mailer.is_configured().await);

        sending.abort();
        server.abort();
    }

    #[tokio::test]
    async fn unknown_encryption_is_rejected() {
        let mailer = SmtpMailer::new("noreply@example.org", "Conference");
        let err = mailer.configure(Some(&settings("starttls"))).await.unwrap_err();
        assert!(matches!(err, MailError::Encryption(_)));
        assert!(!mailer.is_configured().await);
    }
}
