//! Route definitions for the REST API.

mod graph;
mod health;
mod import_export;
mod memories;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health / providers
        .route("/health", get(health::health_check))
        .route("/providers", get(health::list_providers))
        // Memory operations
        .route("/memories", post(memories::store_memory))
        .route("/memories", get(memories::list_memories))
        .route("/memories/query", post(memories::query_memories))
        .route("/memories/stats", get(memories::memory_stats))
        .route("/memories/:id", get(memories::get_memory))
        .route("/memories/:id", delete(memories::delete_memory))
        // Bulk import / export
        .route("/api/v1/memories/import", post(import_export::start_import))
        .route("/api/v1/memories/import/:job_id/status", get(import_export::import_status))
        .route("/api/v1/memories/export", post(import_export::export_memories))
        .route("/api/v1/memories/export/gdpr/:user_id", get(import_export::export_gdpr))
        // Knowledge graph
        .route("/graph/stats", get(graph::graph_stats))
        .route("/graph/query", post(graph::entity_search))
        .route("/graph/explore/:entity_name", get(graph::explore))
        .route("/graph/path/:from/:to", get(graph::path))
        .route("/graph/insights/:memory_id", get(graph::insights))
        .route("/graph/sync/:memory_id", post(graph::sync_memory))
        .route("/graph/bulk-sync", post(graph::bulk_sync))
        .with_state(state)
}
