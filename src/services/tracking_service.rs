use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::ServiceError;
use crate::auth::AuthUser;
use crate::config::TrackingConfig;
use crate::database::models::{ActiveLesson, Lesson, LessonTracking};
use crate::database::{LessonRepository, TrackingRepository};

/// Body of `POST /api/v1/tracking/lesson/enter`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnterLesson {
    pub user_id: Option<String>,
    pub lesson_id: Option<String>,
    pub serie_id: Option<String>,
    pub tab_id: Option<String>,
    pub lesson_title: Option<String>,
}

/// Body of the exit and focus endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabRef {
    pub user_id: Option<String>,
    pub tab_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnteredLesson {
    pub user_id: String,
    pub lesson_id: String,
    pub serie_id: String,
    pub lesson_title: Option<String>,
    pub tab_id: String,
}

#[derive(Clone)]
pub struct TrackingService {
    tracking: Arc<dyn TrackingRepository>,
    lessons: Arc<dyn LessonRepository>,
    stale_after: Duration,
}

impl TrackingService {
    pub fn new(
        tracking: Arc<dyn TrackingRepository>,
        lessons: Arc<dyn LessonRepository>,
        stale_minutes: i64,
    ) -> Self {
        Self {
            tracking,
            lessons,
            stale_after: Duration::minutes(TrackingConfig::clamp_minutes(stale_minutes)),
        }
    }

    pub async fn enter(
        &self,
        caller: &AuthUser,
        input: EnterLesson,
    ) -> Result<EnteredLesson, ServiceError> {
        let user_id = tracked_user(caller, input.user_id)?;
        let (lesson_id, serie_id, tab_id) = match (
            non_empty(input.lesson_id),
            non_empty(input.serie_id),
            non_empty(input.tab_id),
        ) {
            (Some(lesson_id), Some(serie_id), Some(tab_id)) => (lesson_id, serie_id, tab_id),
            _ => return Err(missing_fields()),
        };

        let now = Utc::now();
        let mut tracking = match self.tracking.find(&user_id).await? {
            Some(mut existing) => {
                if existing.prune_stale(now, self.stale_after) > 0 && existing.is_empty() {
                    self.tracking.delete(&user_id).await?;
                    info!(%user_id, "Cleaned up all stale tabs");
                }
                existing
            }
            None => LessonTracking::new(user_id.clone(), now),
        };

        tracking.enter(ActiveLesson {
            lesson_id: lesson_id.clone(),
            serie_id: serie_id.clone(),
            lesson_title: input.lesson_title.clone(),
            tab_id: tab_id.clone(),
            last_active: now,
        });
        self.tracking.save(&tracking).await?;

        info!(%user_id, %tab_id, %lesson_id, "Set current lesson");
        Ok(EnteredLesson {
            user_id,
            lesson_id,
            serie_id,
            lesson_title: input.lesson_title,
            tab_id,
        })
    }

    /// Returns a human readable summary of what happened.
    pub async fn exit(&self, caller: &AuthUser, input: TabRef) -> Result<String, ServiceError> {
        let user_id = tracked_user(caller, input.user_id)?;
        let tab_id = non_empty(input.tab_id).ok_or_else(missing_fields)?;

        let Some(mut tracking) = self.tracking.find(&user_id).await? else {
            return Ok("No tracking data found".to_string());
        };

        tracking.exit(&tab_id, Utc::now());
        if tracking.is_empty() {
            self.tracking.delete(&user_id).await?;
            info!(%user_id, "Cleared all lessons");
            return Ok("All lessons cleared".to_string());
        }

        self.tracking.save(&tracking).await?;
        info!(%user_id, %tab_id, "Cleared lesson");
        Ok(format!(
            "Lesson cleared, {} tabs remaining",
            tracking.active_lessons.len()
        ))
    }

    pub async fn focus(&self, caller: &AuthUser, input: TabRef) -> Result<ActiveLesson, ServiceError> {
        let user_id = tracked_user(caller, input.user_id)?;
        let tab_id = non_empty(input.tab_id).ok_or_else(missing_fields)?;

        let mut tracking = self.tracking.find(&user_id).await?.ok_or_else(|| {
            ServiceError::NotFound("No tracking data found for user".to_string())
        })?;

        let focused = tracking
            .focus(&tab_id, Utc::now())
            .ok_or_else(|| ServiceError::NotFound("Tab not found in active lessons".to_string()))?;
        self.tracking.save(&tracking).await?;

        info!(%user_id, %tab_id, "Updated focus");
        Ok(focused)
    }

    /// The user's focused lesson, enriched with stored lesson details.
    pub async fn current(&self, user_id: &str) -> Result<Value, ServiceError> {
        let tracking = self.tracking.find(user_id).await?;
        let Some((tracking, current)) = tracking.and_then(|t| {
            let current = t.current_lesson.clone()?;
            Some((t, current))
        }) else {
            return Ok(json!({
                "user_id": user_id,
                "is_in_lesson": false,
                "active_lessons": [],
                "total_active_tabs": 0
            }));
        };

        let mut result = json!({
            "user_id": tracking.user_id,
            "lesson_id": current.lesson_id,
            "serie_id": current.serie_id,
            "lesson_title": current.lesson_title,
            "last_updated": tracking.last_updated,
            "is_in_lesson": true,
            "active_lessons": tracking.active_lessons,
            "total_active_tabs": tracking.active_lessons.len()
        });

        if let Some(lesson_data) = self
            .lesson_context(&current.serie_id, &current.lesson_id)
            .await?
        {
            result["lesson_data"] = lesson_data;
        }

        Ok(result)
    }

    /// Lesson details handed to the assistant, if the lesson exists.
    pub async fn lesson_context(
        &self,
        serie_id: &str,
        lesson_id: &str,
    ) -> Result<Option<Value>, ServiceError> {
        let (Ok(serie_id), Ok(lesson_id)) = (Uuid::parse_str(serie_id), Uuid::parse_str(lesson_id))
        else {
            return Ok(None);
        };

        let lesson = self.lessons.find(serie_id, lesson_id).await?;
        Ok(lesson.as_ref().map(lesson_data))
    }
}

fn lesson_data(lesson: &Lesson) -> Value {
    json!({
        "lesson_title": lesson.title,
        "lesson_description": lesson.description,
        "lesson_serie": lesson.serie_id,
        "lesson_video": lesson.video,
        "lesson_transcript": lesson.transcript,
        "transcript_status": lesson.transcript_status,
        "lesson_documents": lesson.documents,
        "createdAt": lesson.created_at,
        "updatedAt": lesson.updated_at,
        "lesson_summary": lesson.summary,
        "lesson_timeline": lesson.timeline
    })
}

fn tracked_user(caller: &AuthUser, requested: Option<String>) -> Result<String, ServiceError> {
    let user_id = non_empty(requested).unwrap_or_else(|| caller.user_id.clone());
    if user_id != caller.user_id {
        return Err(ServiceError::Forbidden(
            "You can only track your own lessons".to_string(),
        ));
    }
    Ok(user_id)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing_fields() -> ServiceError {
    ServiceError::BadRequest("Missing required fields".to_string())
}
