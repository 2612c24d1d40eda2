use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::models::Serie;
use crate::handlers::FormData;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{NotifyReport, SerieForm, SubscriptionOutcome};
use crate::state::AppState;

fn serie_form(form: &FormData) -> SerieForm {
    SerieForm {
        title: form.text("serie_title"),
        description: form.text("serie_description"),
        is_publish: form.flag("isPublish"),
        thumbnail: form.file("serie_thumbnail"),
    }
}

/// POST /api/v1/series
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    form: FormData,
) -> ApiResult<Serie> {
    let serie = state.series.create(&caller, serie_form(&form)).await?;
    Ok(ApiResponse::created(serie).with_message("Series created successfully"))
}

/// GET /api/v1/series/subscribed
pub async fn subscribed(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Vec<Serie>> {
    Ok(ApiResponse::success(
        state.series.subscribed_by(&caller.user_id).await?,
    ))
}

/// GET /api/v1/series/created
pub async fn created(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Vec<Serie>> {
    Ok(ApiResponse::success(
        state.series.created_by(&caller.user_id).await?,
    ))
}

/// PATCH /api/v1/series/:serie_id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(serie_id): Path<String>,
    form: FormData,
) -> ApiResult<Serie> {
    let serie = state
        .series
        .update(&caller, &serie_id, serie_form(&form))
        .await?;
    Ok(ApiResponse::success(serie).with_message("Series updated successfully"))
}

/// POST /api/v1/series/:serie_id/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(serie_id): Path<String>,
) -> ApiResult<SubscriptionOutcome> {
    let outcome = state.series.subscribe(&caller, &serie_id).await?;
    let message = outcome.message.clone();
    Ok(ApiResponse::success(outcome).with_message(message))
}

/// POST /api/v1/series/:serie_id/unsubscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(serie_id): Path<String>,
) -> ApiResult<SubscriptionOutcome> {
    let outcome = state.series.unsubscribe(&caller, &serie_id).await?;
    let message = outcome.message.clone();
    Ok(ApiResponse::success(outcome).with_message(message))
}

/// DELETE /api/v1/series/:serie_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(serie_id): Path<String>,
) -> ApiResult<Value> {
    state.series.delete(&caller, &serie_id).await?;
    Ok(ApiResponse::success(json!({ "deleted": serie_id })).with_message("Series deleted successfully"))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotifyBody {
    pub title: Option<String>,
    pub message: Option<String>,
}

/// POST /api/v1/series/:serie_id/notify
pub async fn notify(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(serie_id): Path<String>,
    body: Option<Json<NotifyBody>>,
) -> ApiResult<NotifyReport> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let report = state
        .series
        .notify(&caller, &serie_id, body.title, body.message)
        .await?;
    Ok(ApiResponse::success(report))
}
