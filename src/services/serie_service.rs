use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{parse_id, NotificationService, NotifyReport, ServiceError};
use crate::auth::AuthUser;
use crate::clients::{MediaClient, MediaKind, UploadFile};
use crate::database::models::{NewSerie, Serie, SerieChanges};
use crate::database::{SerieRepository, UserRepository};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Fields accepted when creating or editing a series.
#[derive(Debug, Clone, Default)]
pub struct SerieForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_publish: Option<bool>,
    pub thumbnail: Option<UploadFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionOutcome {
    pub message: String,
    #[serde(rename = "alreadySubscribed")]
    pub already_subscribed: bool,
    pub subscribed: bool,
}

#[derive(Clone)]
pub struct SerieService {
    series: Arc<dyn SerieRepository>,
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaClient>,
    notifications: NotificationService,
}

impl SerieService {
    pub fn new(
        series: Arc<dyn SerieRepository>,
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaClient>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            series,
            users,
            media,
            notifications,
        }
    }

    pub async fn create(&self, caller: &AuthUser, form: SerieForm) -> Result<Serie, ServiceError> {
        let title = form
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("serie_title is required".to_string()))?;

        let thumbnail = match &form.thumbnail {
            Some(file) => self.upload_thumbnail(file, &caller.user_id).await,
            None => None,
        };

        let serie = self
            .series
            .insert(NewSerie {
                title,
                description: form.description.unwrap_or_default(),
                is_publish: form.is_publish.unwrap_or(false),
                thumbnail,
                owner_id: caller.user_id.clone(),
            })
            .await?;

        info!(serie_id = %serie.id, owner = %serie.owner_id, "Created series");
        Ok(serie)
    }

    /// Newest first. `page` starts at 1.
    pub async fn list(&self, page: Option<i64>, limit: Option<i64>) -> Result<Vec<Serie>, ServiceError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Ok(self.series.list((page - 1) * limit, limit).await?)
    }

    pub async fn get(&self, serie_id: &str) -> Result<Serie, ServiceError> {
        let id = parse_id(serie_id, "Serie")?;
        self.series
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Serie not found".to_string()))
    }

    pub async fn created_by(&self, user_id: &str) -> Result<Vec<Serie>, ServiceError> {
        Ok(self.series.list_by_owner(user_id).await?)
    }

    pub async fn subscribed_by(&self, user_id: &str) -> Result<Vec<Serie>, ServiceError> {
        Ok(self.series.list_subscribed(user_id).await?)
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<Serie>, ServiceError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ServiceError::BadRequest("keyword is required".to_string()));
        }
        Ok(self.series.search_published(keyword).await?)
    }

    pub async fn update(
        &self,
        caller: &AuthUser,
        serie_id: &str,
        form: SerieForm,
    ) -> Result<Serie, ServiceError> {
        let current = self.owned(caller, serie_id).await?;

        let title = match form.title {
            Some(title) if title.trim().is_empty() => {
                return Err(ServiceError::BadRequest(
                    "serie_title cannot be empty".to_string(),
                ))
            }
            other => other.map(|t| t.trim().to_string()),
        };

        let mut changes = SerieChanges {
            title,
            description: form.description,
            is_publish: form.is_publish,
            thumbnail: None,
        };

        if let Some(file) = &form.thumbnail {
            if let Some(old) = current.thumbnail.as_deref() {
                self.media.delete_file(old).await;
            }
            // An empty string clears the stored url when the upload fails.
            changes.thumbnail = Some(
                self.upload_thumbnail(file, &caller.user_id)
                    .await
                    .unwrap_or_default(),
            );
        }

        let serie = self
            .series
            .update(current.id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Serie not found".to_string()))?;

        info!(serie_id = %serie.id, "Updated series");
        Ok(serie)
    }

    pub async fn subscribe(
        &self,
        caller: &AuthUser,
        serie_id: &str,
    ) -> Result<SubscriptionOutcome, ServiceError> {
        let serie = self.get(serie_id).await?;
        self.require_profile(caller).await?;

        if !self.series.subscribe(serie.id, &caller.user_id).await? {
            return Ok(SubscriptionOutcome {
                message: "You are already subscribed to this series.".to_string(),
                already_subscribed: true,
                subscribed: true,
            });
        }

        info!(serie_id = %serie.id, user_id = %caller.user_id, topic = %serie.topic, "Subscribed to series");
        Ok(SubscriptionOutcome {
            message: "Subscribed".to_string(),
            already_subscribed: false,
            subscribed: true,
        })
    }

    pub async fn unsubscribe(
        &self,
        caller: &AuthUser,
        serie_id: &str,
    ) -> Result<SubscriptionOutcome, ServiceError> {
        let serie = self.get(serie_id).await?;
        self.require_profile(caller).await?;

        if !self.series.unsubscribe(serie.id, &caller.user_id).await? {
            return Ok(SubscriptionOutcome {
                message: "You are not subscribed to this series.".to_string(),
                already_subscribed: false,
                subscribed: false,
            });
        }

        info!(serie_id = %serie.id, user_id = %caller.user_id, "Unsubscribed from series");
        Ok(SubscriptionOutcome {
            message: "Unsubscribed successfully.".to_string(),
            already_subscribed: false,
            subscribed: false,
        })
    }

    pub async fn delete(&self, caller: &AuthUser, serie_id: &str) -> Result<(), ServiceError> {
        let serie = self.owned(caller, serie_id).await?;
        if !serie.lessons.is_empty() {
            return Err(ServiceError::BadRequest(
                "Cannot delete a series that still has lessons".to_string(),
            ));
        }

        if !self.series.delete(serie.id).await? {
            return Err(ServiceError::NotFound("Serie not found".to_string()));
        }

        if let Some(thumbnail) = serie.thumbnail.as_deref() {
            self.media.delete_file(thumbnail).await;
        }

        info!(serie_id = %serie.id, "Deleted series");
        Ok(())
    }

    pub async fn notify(
        &self,
        caller: &AuthUser,
        serie_id: &str,
        title: Option<String>,
        message: Option<String>,
    ) -> Result<NotifyReport, ServiceError> {
        let (title, message) = match (
            title.filter(|t| !t.trim().is_empty()),
            message.filter(|m| !m.trim().is_empty()),
        ) {
            (Some(title), Some(message)) => (title, message),
            _ => {
                return Err(ServiceError::BadRequest(
                    "title and message are required".to_string(),
                ))
            }
        };

        let serie = self.owned(caller, serie_id).await?;
        self.notifications
            .notify_subscribers(&serie, &title, &message)
            .await
    }

    /// Send an announcement without an ownership check (admin CLI).
    pub async fn notify_as_admin(
        &self,
        serie_id: &str,
        title: &str,
        message: &str,
    ) -> Result<NotifyReport, ServiceError> {
        let serie = self.get(serie_id).await?;
        self.notifications
            .notify_subscribers(&serie, title, message)
            .await
    }

    /// The series, provided the caller owns it.
    pub(crate) async fn owned(&self, caller: &AuthUser, serie_id: &str) -> Result<Serie, ServiceError> {
        let serie = self.get(serie_id).await?;
        if !serie.is_owned_by(&caller.user_id) {
            return Err(ServiceError::Forbidden(
                "Only the series owner can do this".to_string(),
            ));
        }
        Ok(serie)
    }

    async fn require_profile(&self, caller: &AuthUser) -> Result<(), ServiceError> {
        match self.users.find(&caller.user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound("User not found".to_string())),
        }
    }

    async fn upload_thumbnail(&self, file: &UploadFile, user_id: &str) -> Option<String> {
        match self.media.upload(MediaKind::Thumbnail, file, user_id).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "Thumbnail upload failed; continuing without thumbnail");
                None
            }
        }
    }
}
