//! The `VectorProvider` contract over a closed set of backends.
//!
//! Replaces the teacher's open-ended, 20+ variant `VectorStoreProvider`
//! enum with the three kinds this service actually talks to. New provider
//! types are added by extending `ProviderKind` and implementing the trait,
//! never by runtime registration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MemoriaResult;
use crate::traits::health::ProviderHealth;
use crate::types::{Filter, Memory, QueryMatch};

/// The closed set of backends UnifiedStore fans work out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Relational store with a vector index; read-after-write is mandatory here.
    Primary,
    /// Embedded vector DB used for redundancy; best-effort, may lag.
    Secondary,
    /// Relational graph tables on the PRIMARY pool; ignores embeddings.
    Graph,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Primary => "primary",
            ProviderKind::Secondary => "secondary",
            ProviderKind::Graph => "graph",
        }
    }
}

/// Aggregate counters a provider reports for `/health` and `/providers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderStats {
    pub total_vectors: u64,
    pub avg_query_ms: f64,
}

/// Core VectorProvider trait — PRIMARY, SECONDARY, and GRAPH all implement this.
#[async_trait]
pub trait VectorProvider: Send + Sync {
    /// Which of the closed variant set this instance is.
    fn kind(&self) -> ProviderKind;

    /// Durably persist a memory. On success, subsequent `query`/`get` on this
    /// provider must observe it (read-after-write within the provider).
    async fn store(&self, memory: &Memory) -> MemoriaResult<Uuid>;

    /// Atomically claim `memory.content_hash` and persist `memory` only if
    /// this call is the first to claim it. Returns the id that now owns the
    /// hash: `memory.id` if this call won the race, or another memory's id
    /// if a durable content-hash index already had a row for that hash (in
    /// which case `memory` was NOT stored). Providers with no durable hash
    /// index (SECONDARY/GRAPH) never see this race and default to a plain
    /// `store`, always "winning".
    async fn store_with_content_hash(&self, memory: &Memory) -> MemoriaResult<Uuid> {
        self.store(memory).await
    }

    /// Return up to `limit` results ordered by descending cosine similarity.
    /// Results with `similarity_score < min_similarity` are filtered out.
    async fn query(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filters: Option<&Filter>,
        min_similarity: f32,
    ) -> MemoriaResult<Vec<QueryMatch>>;

    /// Return results ordered by descending `created_at`, `similarity_score`
    /// unset. Used for the empty-query path; never probe with a zero vector.
    async fn recent(
        &self,
        limit: usize,
        offset: usize,
        filters: Option<&Filter>,
    ) -> MemoriaResult<Vec<QueryMatch>>;

    /// Fetch a single memory by id.
    async fn get(&self, id: Uuid) -> MemoriaResult<Option<Memory>>;

    /// Delete a memory by id. Returns whether a row was actually removed.
    async fn delete(&self, id: Uuid) -> MemoriaResult<bool>;

    /// Report this provider's health.
    async fn health_check(&self) -> MemoriaResult<ProviderHealth>;

    /// Report this provider's statistics.
    async fn stats(&self) -> MemoriaResult<ProviderStats>;
}
