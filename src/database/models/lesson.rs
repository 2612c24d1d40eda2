use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "lesson_serie")]
    pub serie_id: Uuid,
    #[serde(rename = "lesson_title")]
    pub title: String,
    #[serde(rename = "lesson_content")]
    pub content: String,
    #[serde(rename = "lesson_video")]
    pub video: Option<String>,
    #[serde(rename = "lesson_documents")]
    pub documents: Vec<String>,
    #[serde(rename = "lesson_description")]
    pub description: Option<String>,
    #[serde(rename = "lesson_transcript")]
    pub transcript: Option<String>,
    pub transcript_status: Option<String>,
    #[serde(rename = "lesson_summary")]
    pub summary: Option<String>,
    #[serde(rename = "lesson_timeline")]
    pub timeline: Option<Value>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub fn has_document(&self, url: &str) -> bool {
        self.documents.iter().any(|doc| doc == url)
    }
}

#[derive(Debug, Clone)]
pub struct NewLesson {
    pub serie_id: Uuid,
    pub title: String,
    pub content: String,
    pub video: Option<String>,
    pub documents: Vec<String>,
}

/// `None` leaves a field untouched; an empty video url clears it.
#[derive(Debug, Clone, Default)]
pub struct LessonChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub video: Option<String>,
    pub documents: Option<Vec<String>>,
}
