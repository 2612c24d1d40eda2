// clients/mod.rs - Outbound integrations: media microservice and outgoing mail

pub mod mailer;
pub mod media;

pub use mailer::{escape_html, MailError, Mailer, OutgoingMail, SmtpMailer};
pub use media::{BatchDeleteResult, HttpMediaClient, MediaClient, MediaError, MediaKind, UploadFile};
