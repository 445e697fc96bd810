//! Knowledge-graph endpoints: entity search, traversal, and sync, delegating
//! to the `GraphQuery` handle held by `AppState` rather than `UnifiedStore`
//! (GRAPH has no PRIMARY/SECONDARY analog for these operations).

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;
use memoria_core::traits::GraphStats;
use memoria_core::types::{ExploreResult, GraphNode, InsightsResult, PathResult};

#[derive(Debug, Deserialize)]
pub struct EntitySearchQuery {
    pub pattern: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

fn default_depth() -> u32 {
    2
}

#[derive(Debug, Serialize)]
pub struct EntitySearchResponse {
    pub entities: Vec<GraphNode>,
}

/// GET /graph/stats
pub async fn graph_stats(State(state): State<AppState>) -> ApiResult<Json<GraphStats>> {
    let stats = state.graph()?.graph_stats().await?;
    Ok(Json(stats))
}

/// POST /graph/query
pub async fn entity_search(
    State(state): State<AppState>,
    Json(request): Json<EntitySearchQuery>,
) -> ApiResult<Json<EntitySearchResponse>> {
    let entities = state.graph()?.entity_search(&request.pattern, request.limit).await?;
    Ok(Json(EntitySearchResponse { entities }))
}

#[derive(Debug, Deserialize)]
pub struct ExploreQueryParams {
    #[serde(default = "default_depth")]
    pub depth: u32,
}

/// GET /graph/explore/{entity_name}
pub async fn explore(
    State(state): State<AppState>,
    Path(entity_name): Path<String>,
    Query(params): Query<ExploreQueryParams>,
) -> ApiResult<Json<ExploreResult>> {
    let result = state.graph()?.explore(&entity_name, params.depth).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct PathQueryParams {
    #[serde(default = "default_depth")]
    pub max_depth: u32,
}

/// GET /graph/path/{from}/{to}
pub async fn path(
    State(state): State<AppState>,
    Path((from, to)): Path<(String, String)>,
    Query(params): Query<PathQueryParams>,
) -> ApiResult<Json<PathResult>> {
    let result = state.graph()?.path(&from, &to, params.max_depth).await?;
    Ok(Json(result))
}

/// GET /graph/insights/{memory_id}
pub async fn insights(
    State(state): State<AppState>,
    Path(memory_id): Path<Uuid>,
) -> ApiResult<Json<InsightsResult>> {
    let result = state.graph()?.insights(memory_id).await?;
    Ok(Json(result))
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub synced: bool,
}

/// POST /graph/sync/{memory_id}
pub async fn sync_memory(
    State(state): State<AppState>,
    Path(memory_id): Path<Uuid>,
) -> ApiResult<Json<SyncResponse>> {
    let memory = state.store.get(memory_id).await?;
    state.graph()?.resync_memory(&memory).await?;
    Ok(Json(SyncResponse { synced: true }))
}

#[derive(Debug, Serialize)]
pub struct BulkSyncResponse {
    pub synced: u64,
    pub failed: u64,
}

/// POST /graph/bulk-sync
///
/// Resyncs every memory currently reachable through PRIMARY's recency
/// listing. Bounded by a generous page size rather than unbounded full-table
/// iteration, matching `UnifiedStore::query`'s own `limit.clamp(1, 1000)`.
pub async fn bulk_sync(State(state): State<AppState>) -> ApiResult<Json<BulkSyncResponse>> {
    let graph = state.graph()?.clone();
    let recent = state.store.query("", 1000, 0.0, None).await?;

    let mut synced = 0u64;
    let mut failed = 0u64;
    for m in recent.results {
        match graph.resync_memory(&m.memory).await {
            Ok(()) => synced += 1,
            Err(_) => failed += 1,
        }
    }

    Ok(Json(BulkSyncResponse { synced, failed }))
}
