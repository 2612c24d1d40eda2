use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A course: an ordered list of lessons owned by one instructor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Serie {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "serie_title")]
    pub title: String,
    #[serde(rename = "serie_description")]
    pub description: String,
    #[serde(rename = "isPublish")]
    pub is_publish: bool,
    #[serde(rename = "serie_thumbnail")]
    pub thumbnail: Option<String>,
    #[serde(rename = "serie_lessons")]
    #[sqlx(default)]
    pub lessons: Vec<Uuid>,
    #[serde(rename = "serie_subscribe_num")]
    pub subscriber_count: i32,
    #[serde(rename = "serie_user")]
    pub owner_id: String,
    #[serde(rename = "serie_topic")]
    pub topic: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Serie {
    /// Notification topic name for a series id.
    pub fn topic_for(id: Uuid) -> String {
        format!("serie_{}", id)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

#[derive(Debug, Clone)]
pub struct NewSerie {
    pub title: String,
    pub description: String,
    pub is_publish: bool,
    pub thumbnail: Option<String>,
    pub owner_id: String,
}

/// `None` leaves a field untouched; an empty thumbnail clears it.
#[derive(Debug, Clone, Default)]
pub struct SerieChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_publish: Option<bool>,
    pub thumbnail: Option<String>,
}

impl SerieChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.is_publish.is_none()
            && self.thumbnail.is_none()
    }
}
