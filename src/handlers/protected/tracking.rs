use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::models::ActiveLesson;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{EnterLesson, EnteredLesson, TabRef};
use crate::state::AppState;

/// POST /api/v1/tracking/lesson/enter
pub async fn enter(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    body: Option<Json<EnterLesson>>,
) -> ApiResult<EnteredLesson> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let entered = state.tracking.enter(&caller, input).await?;
    Ok(ApiResponse::success(entered).with_message("Current lesson set"))
}

/// POST /api/v1/tracking/lesson/exit
pub async fn exit(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    body: Option<Json<TabRef>>,
) -> ApiResult<Value> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let message = state.tracking.exit(&caller, input).await?;
    Ok(ApiResponse::success(json!({})).with_message(message))
}

/// POST /api/v1/tracking/lesson/focus
pub async fn focus(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    body: Option<Json<TabRef>>,
) -> ApiResult<ActiveLesson> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let focused = state.tracking.focus(&caller, input).await?;
    Ok(ApiResponse::success(focused).with_message("Focus updated"))
}

/// GET /api/v1/tracking/user/:user_id/current
pub async fn current(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Value> {
    Ok(ApiResponse::success(state.tracking.current(&user_id).await?))
}
