/// Outgoing mail over SMTP, or log-only when no SMTP host is configured
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("EMAIL_SENDER is not configured")]
    SenderMissing,

    #[error("Invalid email address {0}")]
    InvalidAddress(String),

    #[error("Failed to configure SMTP transport: {0}")]
    Transport(String),

    #[error("Failed to build email message: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Send(String),
}

/// Escape text for interpolation into an HTML body.
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// One message delivered to a batch of blind-copied recipients.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send `mail` and return its message id.
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    sender: Option<Mailbox>,
}

impl SmtpMailer {
    /// Build the mailer from configuration.
    ///
    /// If the SMTP host is empty the mailer operates in no-op mode and only
    /// logs what it would have sent.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let sender = config
            .sender
            .as_deref()
            .map(|address| {
                address
                    .parse::<Mailbox>()
                    .map_err(|_| MailError::InvalidAddress(address.to_string()))
            })
            .transpose()?;

        let host = config.smtp_host.as_deref().unwrap_or("").trim();
        let transport = if host.is_empty() {
            warn!("SMTP host not configured; mailer will operate in no-op mode");
            None
        } else {
            let builder = if config.smtp_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            }
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, sender })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    fn build_message(
        &self,
        sender: &Mailbox,
        mail: &OutgoingMail,
        message_id: &str,
    ) -> Result<Message, MailError> {
        // Recipients only see the sender; the audience is blind-copied.
        let mut builder = Message::builder()
            .from(sender.clone())
            .to(sender.clone())
            .subject(mail.subject.clone())
            .message_id(Some(message_id.to_string()));

        for recipient in &mail.bcc {
            match recipient.parse::<Mailbox>() {
                Ok(mailbox) => builder = builder.bcc(mailbox),
                Err(_) => warn!(%recipient, "Skipping invalid recipient address"),
            }
        }

        let html = mail
            .html
            .clone()
            .unwrap_or_else(|| format!("<p>{}</p>", escape_html(&mail.text)));
        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(mail.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
        let sender = self.sender.as_ref().ok_or(MailError::SenderMissing)?;
        let message_id = format!("<{}@educonnect>", Uuid::new_v4());
        let message = self.build_message(sender, mail, &message_id)?;

        if let Some(transport) = &self.transport {
            transport
                .send(message)
                .await
                .map_err(|e| MailError::Send(e.to_string()))?;
            info!(
                subject = %mail.subject,
                recipients = mail.bcc.len(),
                "Email batch sent"
            );
        } else {
            info!(
                subject = %mail.subject,
                recipients = mail.bcc.len(),
                "Mailer running in no-op mode; skipping actual send"
            );
        }

        Ok(message_id)
    }
}
