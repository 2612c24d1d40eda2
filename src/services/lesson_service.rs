use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use super::{parse_id, NotificationService, ServiceError};
use crate::auth::AuthUser;
use crate::clients::{MediaClient, MediaKind, UploadFile};
use crate::database::models::{Lesson, LessonChanges, NewLesson, Serie};
use crate::database::{LessonRepository, SerieRepository};

/// Fields accepted when creating or editing a lesson.
#[derive(Debug, Clone, Default)]
pub struct LessonForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub video: Option<UploadFile>,
    pub documents: Vec<UploadFile>,
}

#[derive(Clone)]
pub struct LessonService {
    lessons: Arc<dyn LessonRepository>,
    series: Arc<dyn SerieRepository>,
    media: Arc<dyn MediaClient>,
    notifications: NotificationService,
}

impl LessonService {
    pub fn new(
        lessons: Arc<dyn LessonRepository>,
        series: Arc<dyn SerieRepository>,
        media: Arc<dyn MediaClient>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            lessons,
            series,
            media,
            notifications,
        }
    }

    pub async fn create(
        &self,
        caller: &AuthUser,
        serie_id: &str,
        form: LessonForm,
    ) -> Result<Lesson, ServiceError> {
        let serie = self.owned_serie(caller, serie_id).await?;

        let title = form
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::BadRequest("lesson_title is required".to_string()))?;

        let video = match &form.video {
            Some(file) => self.upload_video(file, &caller.user_id).await,
            None => None,
        };
        let documents = self.upload_documents(&form.documents, &caller.user_id).await;

        let lesson = self
            .lessons
            .insert(NewLesson {
                serie_id: serie.id,
                title,
                content: form.content.unwrap_or_default(),
                video,
                documents,
            })
            .await?;

        info!(serie_id = %serie.id, lesson_id = %lesson.id, "Created lesson");
        self.notifications.announce_lesson(&serie, &lesson).await;
        Ok(lesson)
    }

    /// Lessons of a series in creation order.
    pub async fn list(&self, serie_id: &str) -> Result<Vec<Lesson>, ServiceError> {
        let serie = self.serie(serie_id).await?;
        Ok(self.lessons.list_by_serie(serie.id).await?)
    }

    pub async fn get(&self, serie_id: &str, lesson_id: &str) -> Result<Lesson, ServiceError> {
        let serie_id = parse_id(serie_id, "Lesson")?;
        let lesson_id = parse_id(lesson_id, "Lesson")?;
        self.lessons
            .find(serie_id, lesson_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Lesson not found".to_string()))
    }

    pub async fn update(
        &self,
        caller: &AuthUser,
        serie_id: &str,
        lesson_id: &str,
        form: LessonForm,
    ) -> Result<Lesson, ServiceError> {
        let serie = self.owned_serie(caller, serie_id).await?;
        let current = self.get(&serie.id.to_string(), lesson_id).await?;

        let title = match form.title {
            Some(title) if title.trim().is_empty() => {
                return Err(ServiceError::BadRequest(
                    "lesson_title cannot be empty".to_string(),
                ))
            }
            other => other.map(|t| t.trim().to_string()),
        };

        let mut changes = LessonChanges {
            title,
            content: form.content,
            video: None,
            documents: None,
        };

        if let Some(file) = &form.video {
            if let Some(old) = current.video.as_deref() {
                self.media.delete_file(old).await;
            }
            // The old file is gone either way; an empty url clears it.
            changes.video = Some(
                self.upload_video(file, &caller.user_id)
                    .await
                    .unwrap_or_default(),
            );
        }

        if !form.documents.is_empty() {
            if !current.documents.is_empty() {
                let result = self.media.delete_files_batch(&current.documents).await;
                if !result.failed.is_empty() {
                    warn!(failed = ?result.failed, "Some old lesson documents were not deleted");
                }
            }
            let uploaded = self.upload_documents(&form.documents, &caller.user_id).await;
            if !uploaded.is_empty() {
                changes.documents = Some(uploaded);
            }
        }

        let lesson = self
            .lessons
            .update(serie.id, current.id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Lesson not found".to_string()))?;

        info!(lesson_id = %lesson.id, "Updated lesson");
        Ok(lesson)
    }

    pub async fn delete(
        &self,
        caller: &AuthUser,
        serie_id: &str,
        lesson_id: &str,
    ) -> Result<(), ServiceError> {
        let serie = self.owned_serie(caller, serie_id).await?;
        let lesson = self.get(&serie.id.to_string(), lesson_id).await?;

        if !self.lessons.delete(serie.id, lesson.id).await? {
            return Err(ServiceError::NotFound("Lesson not found".to_string()));
        }

        if let Some(video) = lesson.video.as_deref() {
            self.media.delete_file(video).await;
        }
        if !lesson.documents.is_empty() {
            self.media.delete_files_batch(&lesson.documents).await;
        }

        info!(lesson_id = %lesson.id, "Deleted lesson");
        Ok(())
    }

    pub async fn delete_document(
        &self,
        caller: &AuthUser,
        serie_id: &str,
        lesson_id: &str,
        doc_url: Option<String>,
    ) -> Result<(), ServiceError> {
        let doc_url = doc_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ServiceError::BadRequest("docUrl is required".to_string()))?;

        let serie = self.owned_serie(caller, serie_id).await?;
        let lesson = self.get(&serie.id.to_string(), lesson_id).await?;
        if !lesson.has_document(&doc_url) {
            return Err(ServiceError::NotFound(
                "Document not found in lesson".to_string(),
            ));
        }

        let remaining: Vec<String> = lesson
            .documents
            .iter()
            .filter(|doc| **doc != doc_url)
            .cloned()
            .collect();
        self.lessons
            .update(
                serie.id,
                lesson.id,
                LessonChanges {
                    documents: Some(remaining),
                    ..Default::default()
                },
            )
            .await?;

        self.media.delete_file(&doc_url).await;
        info!(lesson_id = %lesson.id, %doc_url, "Removed lesson document");
        Ok(())
    }

    async fn serie(&self, serie_id: &str) -> Result<Serie, ServiceError> {
        let id = parse_id(serie_id, "Serie")?;
        self.series
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Serie not found".to_string()))
    }

    async fn owned_serie(&self, caller: &AuthUser, serie_id: &str) -> Result<Serie, ServiceError> {
        let serie = self.serie(serie_id).await?;
        if !serie.is_owned_by(&caller.user_id) {
            return Err(ServiceError::Forbidden(
                "Only the series owner can manage its lessons".to_string(),
            ));
        }
        Ok(serie)
    }

    async fn upload_video(&self, file: &UploadFile, user_id: &str) -> Option<String> {
        match self.media.upload(MediaKind::Video, file, user_id).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "Video upload failed");
                None
            }
        }
    }

    /// Upload concurrently; failed documents are skipped.
    async fn upload_documents(&self, files: &[UploadFile], user_id: &str) -> Vec<String> {
        let uploads = files
            .iter()
            .map(|file| self.media.upload(MediaKind::Document, file, user_id));

        join_all(uploads)
            .await
            .into_iter()
            .zip(files)
            .filter_map(|(result, file)| match result {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(filename = %file.filename, error = %e, "Document upload failed");
                    None
                }
            })
            .collect()
    }
}
