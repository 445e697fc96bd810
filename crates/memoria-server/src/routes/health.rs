//! Health and provider-status endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;
use memoria_core::store::StoreCounters;
use memoria_core::traits::{HealthStatus, ProviderHealth};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub providers: std::collections::HashMap<String, ProviderHealth>,
    pub counters: StoreCounters,
    pub version: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let health = state.store.health_check().await?;

    Ok(Json(HealthResponse {
        status: health.status,
        providers: health.providers,
        counters: health.counters,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: std::collections::HashMap<String, ProviderHealth>,
    pub graph_enabled: bool,
}

/// GET /providers
pub async fn list_providers(State(state): State<AppState>) -> ApiResult<Json<ProvidersResponse>> {
    let health = state.store.health_check().await?;

    Ok(Json(ProvidersResponse {
        providers: health.providers,
        graph_enabled: state.graph.is_some(),
    }))
}
