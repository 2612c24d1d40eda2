use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::models::Lesson;
use crate::handlers::FormData;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::LessonForm;
use crate::state::AppState;

fn lesson_form(form: &FormData) -> LessonForm {
    LessonForm {
        title: form.text("lesson_title"),
        content: form.text("lesson_content"),
        video: form.file("lesson_video"),
        documents: form.files("lesson_documents"),
    }
}

/// POST /api/v1/series/:serie_id/lessons
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(serie_id): Path<String>,
    form: FormData,
) -> ApiResult<Lesson> {
    let lesson = state
        .lessons
        .create(&caller, &serie_id, lesson_form(&form))
        .await?;
    Ok(ApiResponse::created(lesson).with_message("Lesson created successfully"))
}

/// GET /api/v1/series/:serie_id/lessons
pub async fn list(
    State(state): State<AppState>,
    Path(serie_id): Path<String>,
) -> ApiResult<Vec<Lesson>> {
    Ok(ApiResponse::success(state.lessons.list(&serie_id).await?))
}

/// GET /api/v1/series/:serie_id/lessons/:lesson_id
pub async fn get(
    State(state): State<AppState>,
    Path((serie_id, lesson_id)): Path<(String, String)>,
) -> ApiResult<Lesson> {
    Ok(ApiResponse::success(
        state.lessons.get(&serie_id, &lesson_id).await?,
    ))
}

/// PATCH /api/v1/series/:serie_id/lessons/:lesson_id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path((serie_id, lesson_id)): Path<(String, String)>,
    form: FormData,
) -> ApiResult<Lesson> {
    let lesson = state
        .lessons
        .update(&caller, &serie_id, &lesson_id, lesson_form(&form))
        .await?;
    Ok(ApiResponse::success(lesson).with_message("Lesson updated successfully"))
}

/// DELETE /api/v1/series/:serie_id/lessons/:lesson_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path((serie_id, lesson_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    state.lessons.delete(&caller, &serie_id, &lesson_id).await?;
    Ok(ApiResponse::success(json!({ "deleted": lesson_id }))
        .with_message("Lesson deleted successfully"))
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentBody {
    #[serde(rename = "docUrl")]
    pub doc_url: Option<String>,
}

/// DELETE /api/v1/series/:serie_id/lessons/:lesson_id/documents
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path((serie_id, lesson_id)): Path<(String, String)>,
    body: Option<Json<DocumentBody>>,
) -> ApiResult<Value> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let doc_url = body.doc_url.clone();
    state
        .lessons
        .delete_document(&caller, &serie_id, &lesson_id, body.doc_url)
        .await?;
    Ok(ApiResponse::success(json!({ "docUrl": doc_url }))
        .with_message("Document deleted successfully"))
}
