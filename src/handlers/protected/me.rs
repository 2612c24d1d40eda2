use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::auth::AuthUser;

/// GET /api/me-test - echoes the verified caller
pub async fn me_test(Extension(user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "status": "authenticated",
        "user": user
    }))
}
