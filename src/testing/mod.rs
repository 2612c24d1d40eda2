//! Test helpers: in-memory storage, recording fakes for the external
//! services and signed tokens.

pub mod fakes;
pub mod memory;
pub mod tokens;

use axum::body::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::clients::UploadFile;
use crate::config::AppConfig;
use crate::database::models::Lesson;
use crate::services::{LessonService, SerieService, TrackingService, UserService};
use crate::state::{AppState, Repositories};
use fakes::{RecordingMailer, RecordingMediaClient};
use memory::MemoryStore;

/// Authenticated caller with just a subject and an email.
pub fn caller(sub: &str, email: &str) -> AuthUser {
    let claims = match json!({ "sub": sub, "email": email }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    AuthUser::from_claims("test-token", claims).expect("valid claims")
}

pub fn png(name: &str) -> UploadFile {
    UploadFile {
        filename: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
    }
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile {
        filename: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: Bytes::from_static(b"%PDF-1.4"),
    }
}

pub fn sample_lesson(serie_id: Uuid, title: &str) -> Lesson {
    let now = Utc::now();
    Lesson {
        id: Uuid::new_v4(),
        serie_id,
        title: title.to_string(),
        content: String::new(),
        video: None,
        documents: Vec::new(),
        description: None,
        transcript: None,
        transcript_status: None,
        summary: None,
        timeline: None,
        created_at: now,
        updated_at: now,
    }
}

/// Development config that accepts unsigned tokens.
pub fn insecure_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.auth.allow_insecure = true;
    config
}

/// Fully wired application state over in-memory storage and fakes.
pub struct TestServices {
    pub store: Arc<MemoryStore>,
    pub media: Arc<RecordingMediaClient>,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
    pub users: UserService,
    pub series: SerieService,
    pub lessons: LessonService,
    pub tracking: TrackingService,
}

impl TestServices {
    pub fn new() -> Self {
        Self::build(insecure_config(), RecordingMediaClient::default())
    }

    pub fn with_failing_uploads() -> Self {
        Self::build(insecure_config(), RecordingMediaClient::failing())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::build(config, RecordingMediaClient::default())
    }

    fn build(config: AppConfig, media: RecordingMediaClient) -> Self {
        let store = Arc::new(MemoryStore::default());
        let media = Arc::new(media);
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppState::build(
            config,
            Repositories::shared(store.clone()),
            media.clone(),
            mailer.clone(),
            None,
        );

        Self {
            users: state.users.clone(),
            series: state.series.clone(),
            lessons: state.lessons.clone(),
            tracking: state.tracking.clone(),
            store,
            media,
            mailer,
            state,
        }
    }
}
