use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

const OPENAPI_YAML: &str = include_str!("../../../openapi.yaml");

static OPENAPI: Lazy<Result<Value, String>> =
    Lazy::new(|| serde_yaml::from_str(OPENAPI_YAML).map_err(|e| e.to_string()));

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "EduConnect API",
            "version": env!("CARGO_PKG_VERSION"),
            "message": "Welcome to the EduConnect API",
            "endpoints": {
                "health": "/health (public)",
                "docs": "/apispec.json (public)",
                "series": "/api/v1/series[/:serie_id] (public reads, protected writes)",
                "lessons": "/api/v1/series/:serie_id/lessons[/:lesson_id] (protected)",
                "users": "/api/v1/users/* (protected)",
                "tracking": "/api/v1/tracking/* (protected)"
            }
        }
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "Health check failed to reach the database");
                "unreachable"
            }
        },
        None => "not_configured",
    };

    let healthy = database != "unreachable";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "database": database,
            "auth": if state.verifier.is_configured() { "configured" } else { "not_configured" },
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// GET /apispec.json - the bundled OpenAPI document
pub async fn apispec() -> Result<Json<Value>, ApiError> {
    match &*OPENAPI {
        Ok(spec) => Ok(Json(spec.clone())),
        Err(e) => {
            tracing::error!(error = %e, "Bundled OpenAPI document is invalid");
            Err(ApiError::internal_server_error("API description unavailable"))
        }
    }
}
