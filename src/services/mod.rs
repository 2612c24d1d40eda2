// services/mod.rs - Business rules on top of the repositories and outbound clients

pub mod lesson_service;
pub mod notification_service;
pub mod serie_service;
pub mod tracking_service;
pub mod user_service;

pub use lesson_service::{LessonForm, LessonService};
pub use notification_service::{NotificationService, NotifyReport};
pub use serie_service::{SerieForm, SerieService, SubscriptionOutcome};
pub use tracking_service::{EnterLesson, EnteredLesson, TabRef, TrackingService};
pub use user_service::{ProfileInput, SyncInput, UserService};

use thiserror::Error;
use uuid::Uuid;

use crate::clients::MailError;
use crate::database::DatabaseError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Path ids that are not valid UUIDs cannot name a stored row.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::NotFound(format!("{} not found", what)))
}
