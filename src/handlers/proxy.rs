use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::error::ApiError;
use crate::proxy::{relative_path, Forwarded};
use crate::state::AppState;

pub const USERS_PREFIX: &str = "/api/v1/users";
pub const TRACKING_PREFIX: &str = "/api/v1/tracking";

/// ANY /api/v1/users and /api/v1/users/*
pub async fn users(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let proxy = state
        .user_proxy
        .as_ref()
        .ok_or_else(|| ApiError::not_found("User service is not configured"))?;

    let path = relative_path(request.uri().path(), USERS_PREFIX).to_string();
    Ok(proxy.forward(&path, request).await?.into_response())
}

/// ANY /api/v1/tracking/*
pub async fn tracking(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let proxy = state
        .tracking_proxy
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Tracking service is not configured"))?;

    let path = relative_path(request.uri().path(), TRACKING_PREFIX).to_string();
    let wants_current = request.method() == Method::GET && is_current_lesson_path(&path);

    let forwarded = proxy.forward(&path, request).await?;
    if wants_current && forwarded.status == StatusCode::OK {
        if let Some(enriched) = enrich_current(&state, &forwarded).await {
            let response = Json(enriched).into_response();
            return Ok(with_upstream_headers(response, &forwarded.headers));
        }
    }

    Ok(forwarded.into_response())
}

/// Carries the upstream headers over to a response we re-serialised.
fn with_upstream_headers(mut response: Response, upstream: &HeaderMap) -> Response {
    let headers = response.headers_mut();
    for (name, value) in upstream {
        if name != header::CONTENT_TYPE {
            headers.append(name.clone(), value.clone());
        }
    }
    response
}

/// `user/{user_id}/current`
fn is_current_lesson_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    matches!(segments.as_slice(), ["user", user_id, "current"] if !user_id.is_empty())
}

/// Adds `lesson_data` when the user is in a lesson we know about. `None`
/// leaves the upstream response untouched.
async fn enrich_current(state: &AppState, forwarded: &Forwarded) -> Option<Value> {
    let mut body: Value = serde_json::from_slice(&forwarded.body).ok()?;

    let in_lesson = body
        .get("is_in_lesson")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let lesson_id = body.get("lesson_id").and_then(Value::as_str)?.to_string();
    if !in_lesson {
        return Some(body);
    }
    let serie_id = body
        .get("serie_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match state.tracking.lesson_context(&serie_id, &lesson_id).await {
        Ok(Some(lesson_data)) => {
            body["lesson_data"] = lesson_data;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to enrich tracking response with lesson data");
            return None;
        }
    }

    Some(body)
}
