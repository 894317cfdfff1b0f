use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use murmur_embedder::Embedder;
use murmur_job_interface::SearchHit;
use murmur_store::JobStore;

use crate::AppState;
use crate::error::{ApiError, Result};
use crate::routes::jobs::require_user;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

pub(super) async fn search<S: JobStore, E: Embedder + 'static>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let user_id = require_user(&headers)?;

    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let hits = state.search.search(user_id, q, limit).await?;
    Ok(Json(SearchResponse {
        query: q.to_string(),
        hits,
    }))
}
