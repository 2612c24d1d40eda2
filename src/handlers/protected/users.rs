use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::AuthUser;
use crate::database::models::{User, UserChanges};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ProfileInput, SyncInput};
use crate::state::AppState;

/// POST /api/v1/users/profile
pub async fn create_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    body: Result<Json<ProfileInput>, JsonRejection>,
) -> ApiResult<User> {
    let Json(input) = body?;
    let user = state.users.create_profile(&caller, input).await?;
    Ok(ApiResponse::created(user).with_message("User profile created successfully"))
}

/// GET /api/v1/users/profile - created from the token claims on first call
pub async fn current_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<User> {
    let (user, created) = state.users.current_profile(&caller).await?;
    if created {
        return Ok(ApiResponse::with_status(user, StatusCode::CREATED)
            .with_message("User profile created automatically"));
    }
    Ok(ApiResponse::success(user))
}

/// GET /api/v1/users/:user_id
pub async fn get(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult<User> {
    Ok(ApiResponse::success(state.users.get(&user_id).await?))
}

/// PUT /api/v1/users/:user_id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<String>,
    body: Result<Json<UserChanges>, JsonRejection>,
) -> ApiResult<User> {
    state.users.ensure_own_profile(&caller, &user_id)?;

    let Json(changes) = body?;
    if changes.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    let user = state.users.update_profile(&caller, &user_id, changes).await?;
    Ok(ApiResponse::success(user).with_message("User profile updated successfully"))
}

/// POST /api/v1/users/sync
pub async fn sync(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    input: Option<Json<SyncInput>>,
) -> ApiResult<User> {
    let input = input.map(|Json(input)| input).unwrap_or_default();
    let user = state.users.sync(&caller, input).await?;
    Ok(ApiResponse::success(user).with_message("User profile synced"))
}
