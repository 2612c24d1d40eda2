use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::database::models::Serie;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
}

/// GET /api/v1/series - newest first, paginated
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Serie>> {
    let series = state.series.list(query.page, query.limit).await?;
    Ok(ApiResponse::success(series))
}

/// GET /api/v1/series/search?keyword=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Serie>> {
    let keyword = query.keyword.unwrap_or_default();
    Ok(ApiResponse::success(state.series.search(&keyword).await?))
}

/// GET /api/v1/series/:serie_id
pub async fn get(State(state): State<AppState>, Path(serie_id): Path<String>) -> ApiResult<Serie> {
    Ok(ApiResponse::success(state.series.get(&serie_id).await?))
}
