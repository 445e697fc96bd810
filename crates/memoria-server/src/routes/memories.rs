//! Memory CRUD and query endpoints, backed directly by `UnifiedStore`.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use memoria_core::traits::{ProviderKind, ProviderStats};
use memoria_core::types::{Filter, Memory, QueryMatch, QueryMode, StoreResponse};

/// Fold the `user_id`/`conversation_id` convenience fields and a raw
/// `filters` map into a single composite `Filter`, the way the HTTP layer
/// is expected to build filters for `UnifiedStore::query` (the core itself
/// only knows about `Filter`, not these request-shaped conveniences).
fn build_filter(
    filters: Option<HashMap<String, serde_json::Value>>,
    user_id: Option<String>,
    conversation_id: Option<String>,
) -> Option<Filter> {
    let mut conditions: Vec<Filter> = filters
        .map(|f| memoria_core::types::from_simple_filters(&f))
        .into_iter()
        .collect();

    if let Some(user_id) = user_id {
        conditions.push(Filter::eq("user_id", user_id));
    }
    if let Some(conversation_id) = conversation_id {
        conditions.push(Filter::eq("conversation_id", conversation_id));
    }

    match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(Filter::and(conditions)),
    }
}

/// Request body for storing a memory.
/// POST /memories
#[derive(Debug, Deserialize)]
pub struct StoreMemoryRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub importance_score: Option<f32>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

pub async fn store_memory(
    State(state): State<AppState>,
    Json(request): Json<StoreMemoryRequest>,
) -> ApiResult<Json<StoreResponse>> {
    let mut metadata = request.metadata.unwrap_or_default();
    if let Some(user_id) = request.user_id {
        metadata.insert("user_id".to_string(), serde_json::Value::String(user_id));
    }
    if let Some(conversation_id) = request.conversation_id {
        metadata.insert("conversation_id".to_string(), serde_json::Value::String(conversation_id));
    }
    let metadata = if metadata.is_empty() { None } else { Some(metadata) };

    let response = state
        .store
        .store(&request.content, metadata, request.importance_score)
        .await?;
    Ok(Json(response))
}

/// Request body for a similarity/recency query.
/// POST /memories/query
#[derive(Debug, Deserialize)]
pub struct QueryMemoriesRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub min_similarity: f32,
    #[serde(default)]
    pub filters: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct QueryMemoriesResponse {
    pub results: Vec<QueryMatch>,
    pub mode: QueryMode,
    pub skipped_providers: Vec<String>,
}

pub async fn query_memories(
    State(state): State<AppState>,
    Json(request): Json<QueryMemoriesRequest>,
) -> ApiResult<Json<QueryMemoriesResponse>> {
    let filter = build_filter(request.filters, request.user_id, request.conversation_id);
    let response = state
        .store
        .query(&request.query, request.limit, request.min_similarity, filter.as_ref())
        .await?;

    Ok(Json(QueryMemoriesResponse {
        results: response.results,
        mode: response.mode,
        skipped_providers: response.skipped_providers,
    }))
}

/// Query parameters for listing recent memories. `offset` is accepted for
/// API-contract symmetry with the query string but `UnifiedStore::query`'s
/// recency path doesn't take a page offset, so anything but 0 is rejected
/// rather than silently ignored.
#[derive(Debug, Deserialize)]
pub struct ListMemoriesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub importance_min: Option<f32>,
    #[serde(default)]
    pub importance_max: Option<f32>,
    #[serde(default)]
    pub created_after: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub created_before: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ListMemoriesResponse {
    pub results: Vec<QueryMatch>,
}

pub async fn list_memories(
    State(state): State<AppState>,
    Query(params): Query<ListMemoriesQuery>,
) -> ApiResult<Json<ListMemoriesResponse>> {
    if params.offset != 0 {
        return Err(ApiError::bad_request("pagination offset is not supported for recency listings"));
    }

    let mut conditions = Vec::new();
    if let Some(user_id) = params.user_id {
        conditions.push(Filter::eq("user_id", user_id));
    }
    if let (Some(min), Some(max)) = (params.importance_min, params.importance_max) {
        conditions.push(Filter::between("importance_score", min, max));
    } else if let Some(min) = params.importance_min {
        conditions.push(Filter::gte("importance_score", min));
    } else if let Some(max) = params.importance_max {
        conditions.push(Filter::lte("importance_score", max));
    }
    if let Some(after) = params.created_after {
        conditions.push(Filter::gte("created_at", after.to_rfc3339()));
    }
    if let Some(before) = params.created_before {
        conditions.push(Filter::lte("created_at", before.to_rfc3339()));
    }
    let filter = match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(Filter::and(conditions)),
    };

    let response = state.store.query("", params.limit, 0.0, filter.as_ref()).await?;
    Ok(Json(ListMemoriesResponse { results: response.results }))
}

/// GET /memories/{id}
pub async fn get_memory(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Memory>> {
    let memory = state.store.get(id).await?;
    Ok(Json(memory))
}

/// DELETE /memories/{id}
pub async fn delete_memory(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<serde_json::Value>> {
    let deleted = state.store.delete(id).await?;
    if !deleted {
        return Err(ApiError::not_found(format!("no memory with id '{}'", id)));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Serialize)]
pub struct MemoryStatsResponse {
    pub total_memories: u64,
    pub memories_by_provider: HashMap<String, ProviderStats>,
}

/// GET /memories/stats
pub async fn memory_stats(State(state): State<AppState>) -> ApiResult<Json<MemoryStatsResponse>> {
    let memories_by_provider = state.store.provider_stats().await;
    let total_memories = memories_by_provider
        .get(ProviderKind::Primary.as_str())
        .map(|s| s.total_vectors)
        .unwrap_or(0);

    Ok(Json(MemoryStatsResponse {
        total_memories,
        memories_by_provider,
    }))
}
