//! `UnifiedStore`: the orchestrator that ties an `EmbeddingModel`, a
//! `Deduplicator`, and a PRIMARY provider (plus best-effort SECONDARY/GRAPH
//! providers) into the store/query algorithm.
//!
//! Grounded stylistically on the teacher's `retrieval::engine::RetrievalEngine`:
//! a struct generic only insofar as it holds `Arc<dyn Trait>` fields, a
//! handful of `retrieve_*` methods, and a hand-written-mock test module
//! rather than `mockall`. The algorithm itself — content-hash dedup before
//! embedding, mandatory PRIMARY, best-effort fanout, recency path for empty
//! queries — has no teacher analog and is new.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dedup::{DedupDecision, DeduplicationConfig, Deduplicator};
use crate::error::{MemoriaError, MemoriaResult};
use crate::traits::{EmbeddingModel, HealthStatus, ProviderHealth, ProviderKind, ProviderStats, VectorProvider};
use crate::types::{Filter, Memory, QueryMatch, QueryMode, QueryResponse, StoreResponse};

/// Best-effort fanout to SECONDARY providers never blocks a write past this.
const SECONDARY_STORE_DEADLINE: Duration = Duration::from_millis(1000);
/// Merging SECONDARY results into a query response never blocks past this.
const SECONDARY_QUERY_DEADLINE: Duration = Duration::from_millis(1000);

/// Rolling service counters surfaced by `health_check`/`stats`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StoreCounters {
    pub total_stores: u64,
    pub total_queries: u64,
    pub avg_query_ms: f64,
    pub error_count: u64,
    pub duplicate_count: u64,
}

impl StoreCounters {
    fn record_query(&mut self, elapsed: Duration) {
        self.total_queries += 1;
        let sample = elapsed.as_secs_f64() * 1000.0;
        self.avg_query_ms += (sample - self.avg_query_ms) / self.total_queries as f64;
    }
}

/// Overall health of the composed store.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoreHealth {
    pub status: HealthStatus,
    pub providers: HashMap<String, ProviderHealth>,
    pub counters: StoreCounters,
}

/// Composition root: one designated PRIMARY provider, any number of
/// SECONDARY/GRAPH providers, one `EmbeddingModel`, one `Deduplicator`.
pub struct UnifiedStore {
    primary: Arc<dyn VectorProvider>,
    secondaries: Vec<Arc<dyn VectorProvider>>,
    embedding_model: Arc<dyn EmbeddingModel>,
    deduplicator: Arc<Deduplicator>,
    counters: RwLock<StoreCounters>,
}

impl UnifiedStore {
    /// Build a store from a provider list containing exactly one `Primary`.
    pub fn new(
        dedup_config: DeduplicationConfig,
        embedding_model: Arc<dyn EmbeddingModel>,
        providers: Vec<Arc<dyn VectorProvider>>,
    ) -> MemoriaResult<Self> {
        let mut primary = None;
        let mut secondaries = Vec::new();

        for provider in providers {
            match provider.kind() {
                ProviderKind::Primary if primary.is_some() => {
                    return Err(MemoriaError::internal(
                        "UnifiedStore given more than one PRIMARY provider",
                    ));
                }
                ProviderKind::Primary => primary = Some(provider),
                ProviderKind::Secondary | ProviderKind::Graph => secondaries.push(provider),
            }
        }

        let primary = primary
            .ok_or_else(|| MemoriaError::internal("UnifiedStore requires exactly one PRIMARY provider"))?;

        Ok(Self {
            primary,
            secondaries,
            embedding_model,
            deduplicator: Arc::new(Deduplicator::new(dedup_config)),
            counters: RwLock::new(StoreCounters::default()),
        })
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.deduplicator
    }

    /// Store `content`, deduplicating by content hash (and, in active mode,
    /// by semantic similarity) before embedding. See the module docs for the
    /// full algorithm.
    pub async fn store(
        &self,
        content: &str,
        metadata: Option<HashMap<String, serde_json::Value>>,
        importance_score: Option<f32>,
    ) -> MemoriaResult<StoreResponse> {
        let content = content.trim();
        if content.is_empty() {
            return Err(MemoriaError::invalid_request("content must not be empty"));
        }
        if content.len() > 64 * 1024 {
            return Err(MemoriaError::invalid_request("content exceeds 64KiB limit"));
        }

        let hash = crate::types::content_hash(content);

        if let Some(existing_id) = self.deduplicator.check_exact(&hash) {
            if matches!(self.deduplicator.config().mode, crate::dedup::DeduplicationMode::Active) {
                return self.duplicate_response(existing_id, 1.0, "content hash already stored").await;
            }
            let mut counters = self.counters.write().await;
            counters.duplicate_count += 1;
        }

        let embedding = self.embedding_model.embed(content).await?;

        if matches!(self.deduplicator.config().mode, crate::dedup::DeduplicationMode::Active) {
            let neighbor = self
                .primary
                .query(&embedding, 1, None, 0.0)
                .await
                .unwrap_or_default()
                .into_iter()
                .next()
                .and_then(|m| m.similarity_score.map(|s| (m.memory.id, s)));

            let outcome = self.deduplicator.check(&hash, neighbor);
            if outcome.decision == DedupDecision::SemanticDuplicate {
                let existing_id = outcome.existing_id.expect("semantic duplicate carries an id");
                let similarity = outcome.similarity.unwrap_or(1.0);
                return self.duplicate_response(existing_id, similarity, &outcome.reason).await;
            }
        }

        let mut memory = Memory::new(content, embedding, chrono::Utc::now());
        if let Some(metadata) = metadata {
            memory = memory.with_metadata(metadata);
        }
        if let Some(score) = importance_score {
            memory = memory.with_importance(score);
        }

        let owner = self
            .primary
            .store_with_content_hash(&memory)
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("PRIMARY store failed: {}", e)))?;

        if owner != memory.id {
            // Another store (possibly concurrent, possibly from a prior
            // process) already claimed this content hash in PRIMARY's
            // durable index; this one was never persisted. Cache the
            // winner's id so the next caller with the same hash takes the
            // fast in-process path instead of round-tripping to PRIMARY.
            self.deduplicator.record(hash, owner);
            return self.duplicate_response(owner, 1.0, "content hash already stored").await;
        }

        self.fanout_store(&memory).await;
        self.deduplicator.record(hash, memory.id);

        {
            let mut counters = self.counters.write().await;
            counters.total_stores += 1;
        }

        Ok(StoreResponse {
            memory,
            is_duplicate: false,
            duplicate_reason: None,
        })
    }

    async fn duplicate_response(
        &self,
        existing_id: Uuid,
        similarity: f32,
        reason: &str,
    ) -> MemoriaResult<StoreResponse> {
        let memory = self
            .primary
            .get(existing_id)
            .await?
            .ok_or_else(|| MemoriaError::internal("duplicate pointed at a missing PRIMARY record"))?;

        let _ = similarity;
        Ok(StoreResponse {
            memory,
            is_duplicate: true,
            duplicate_reason: Some(reason.to_string()),
        })
    }

    /// Best-effort fanout to SECONDARY/GRAPH providers. Failures are counted,
    /// never surfaced to the caller — the PRIMARY write already committed.
    async fn fanout_store(&self, memory: &Memory) {
        let futures = self.secondaries.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let memory = memory.clone();
            async move {
                match tokio::time::timeout(SECONDARY_STORE_DEADLINE, provider.store(&memory)).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => warn!(provider = provider.kind().as_str(), error = %e, "secondary store failed"),
                    Err(_) => warn!(provider = provider.kind().as_str(), "secondary store timed out"),
                }
            }
        });
        join_all(futures).await;
    }

    /// Query by text (or, if blank, recency). See the module docs.
    pub async fn query(
        &self,
        query_text: &str,
        limit: usize,
        min_similarity: f32,
        filters: Option<&Filter>,
    ) -> MemoriaResult<QueryResponse> {
        let limit = limit.clamp(1, 1000);
        let started = Instant::now();

        let response = if query_text.trim().is_empty() {
            let results = self.primary.recent(limit, 0, filters).await?;
            QueryResponse {
                results,
                mode: QueryMode::Recent,
                skipped_providers: Vec::new(),
            }
        } else {
            let embedding = self.embedding_model.embed(query_text).await?;
            let mut results = self.primary.query(&embedding, limit, filters, min_similarity).await?;
            let skipped = self.merge_secondaries(&embedding, limit, filters, min_similarity, &mut results).await;

            results.sort_by(|a, b| {
                b.similarity_score
                    .partial_cmp(&a.similarity_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
                    .then_with(|| a.memory.id.cmp(&b.memory.id))
            });
            results.truncate(limit);

            QueryResponse {
                results,
                mode: QueryMode::Similarity,
                skipped_providers: skipped,
            }
        };

        let mut counters = self.counters.write().await;
        counters.record_query(started.elapsed());

        Ok(response)
    }

    /// Merge SECONDARY results into `primary_results` by id, preferring the
    /// PRIMARY score on conflict. Returns the names of providers that missed
    /// the soft deadline.
    async fn merge_secondaries(
        &self,
        embedding: &[f32],
        limit: usize,
        filters: Option<&Filter>,
        min_similarity: f32,
        primary_results: &mut Vec<QueryMatch>,
    ) -> Vec<String> {
        let mut skipped = Vec::new();
        let mut seen: std::collections::HashSet<Uuid> =
            primary_results.iter().map(|m| m.memory.id).collect();

        for provider in &self.secondaries {
            if provider.kind() != ProviderKind::Secondary {
                continue;
            }
            match tokio::time::timeout(
                SECONDARY_QUERY_DEADLINE,
                provider.query(embedding, limit, filters, min_similarity),
            )
            .await
            {
                Ok(Ok(matches)) => {
                    for m in matches {
                        if seen.insert(m.memory.id) {
                            primary_results.push(m);
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(provider = provider.kind().as_str(), error = %e, "secondary query failed");
                    skipped.push(provider.kind().as_str().to_string());
                }
                Err(_) => {
                    warn!(provider = provider.kind().as_str(), "secondary query timed out");
                    skipped.push(provider.kind().as_str().to_string());
                }
            }
        }

        skipped
    }

    pub async fn get(&self, id: Uuid) -> MemoriaResult<Memory> {
        self.primary.get(id).await?.ok_or_else(|| MemoriaError::not_found(id.to_string()))
    }

    pub async fn delete(&self, id: Uuid) -> MemoriaResult<bool> {
        let deleted = self.primary.delete(id).await?;
        for provider in &self.secondaries {
            let provider = Arc::clone(provider);
            let _ = tokio::time::timeout(SECONDARY_STORE_DEADLINE, provider.delete(id)).await;
        }
        Ok(deleted)
    }

    /// Per-provider `ProviderStats`, keyed by `ProviderKind::as_str()`. A
    /// provider whose `stats()` call fails is reported as all-zero rather
    /// than dropped, so callers can still see every configured provider.
    pub async fn provider_stats(&self) -> HashMap<String, ProviderStats> {
        let mut stats = HashMap::new();

        let primary_stats = self.primary.stats().await.unwrap_or_default();
        stats.insert(self.primary.kind().as_str().to_string(), primary_stats);

        for provider in &self.secondaries {
            let provider_stats = provider.stats().await.unwrap_or_default();
            stats.insert(provider.kind().as_str().to_string(), provider_stats);
        }

        stats
    }

    /// Overall health: the worst of every provider's status, plus per-provider
    /// detail and the service's rolling counters.
    pub async fn health_check(&self) -> MemoriaResult<StoreHealth> {
        let mut providers = HashMap::new();
        let mut worst = HealthStatus::Healthy;

        let primary_health = self.primary.health_check().await.unwrap_or(ProviderHealth {
            status: HealthStatus::Unavailable,
            details: "health check failed".to_string(),
        });
        worst = worst.worst(primary_health.status);
        providers.insert(self.primary.kind().as_str().to_string(), primary_health);

        for provider in &self.secondaries {
            let health = provider.health_check().await.unwrap_or(ProviderHealth {
                status: HealthStatus::Unavailable,
                details: "health check failed".to_string(),
            });
            worst = worst.worst(health.status);
            providers.insert(provider.kind().as_str().to_string(), health);
        }

        let embedding_health = self.embedding_model.health_check().await.unwrap_or(ProviderHealth {
            status: HealthStatus::Unavailable,
            details: "embedding health check failed".to_string(),
        });
        worst = worst.worst(embedding_health.status);
        providers.insert("embedding".to_string(), embedding_health);

        let counters = self.counters.read().await.clone();
        info!(status = ?worst, "unified store health check");

        Ok(StoreHealth {
            status: worst,
            providers,
            counters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ProviderStats;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockProvider {
        kind: ProviderKind,
        records: Mutex<HashMap<Uuid, Memory>>,
        fail_store: bool,
    }

    impl MockProvider {
        fn new(kind: ProviderKind) -> Self {
            Self {
                kind,
                records: Mutex::new(HashMap::new()),
                fail_store: false,
            }
        }

        fn failing(kind: ProviderKind) -> Self {
            Self {
                kind,
                records: Mutex::new(HashMap::new()),
                fail_store: true,
            }
        }
    }

    #[async_trait]
    impl VectorProvider for MockProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn store(&self, memory: &Memory) -> MemoriaResult<Uuid> {
            if self.fail_store {
                return Err(MemoriaError::provider_unavailable("mock failure"));
            }
            self.records.lock().unwrap().insert(memory.id, memory.clone());
            Ok(memory.id)
        }

        async fn query(
            &self,
            _query_embedding: &[f32],
            limit: usize,
            _filters: Option<&Filter>,
            _min_similarity: f32,
        ) -> MemoriaResult<Vec<QueryMatch>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .values()
                .take(limit)
                .cloned()
                .map(|memory| QueryMatch {
                    memory,
                    similarity_score: Some(0.99),
                })
                .collect())
        }

        async fn recent(
            &self,
            limit: usize,
            _offset: usize,
            _filters: Option<&Filter>,
        ) -> MemoriaResult<Vec<QueryMatch>> {
            let records = self.records.lock().unwrap();
            let mut matches: Vec<_> = records
                .values()
                .cloned()
                .map(|memory| QueryMatch {
                    memory,
                    similarity_score: None,
                })
                .collect();
            matches.sort_by(|a, b| b.memory.created_at.cmp(&a.memory.created_at));
            matches.truncate(limit);
            Ok(matches)
        }

        async fn get(&self, id: Uuid) -> MemoriaResult<Option<Memory>> {
            Ok(self.records.lock().unwrap().get(&id).cloned())
        }

        async fn delete(&self, id: Uuid) -> MemoriaResult<bool> {
            Ok(self.records.lock().unwrap().remove(&id).is_some())
        }

        async fn health_check(&self) -> MemoriaResult<ProviderHealth> {
            Ok(ProviderHealth {
                status: HealthStatus::Healthy,
                details: "mock".to_string(),
            })
        }

        async fn stats(&self) -> MemoriaResult<ProviderStats> {
            Ok(ProviderStats {
                total_vectors: self.records.lock().unwrap().len() as u64,
                avg_query_ms: 0.0,
            })
        }
    }

    struct MockEmbeddingModel;

    #[async_trait]
    impl EmbeddingModel for MockEmbeddingModel {
        async fn embed(&self, text: &str) -> MemoriaResult<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn build_store(dedup_mode: crate::dedup::DeduplicationMode) -> UnifiedStore {
        let primary = Arc::new(MockProvider::new(ProviderKind::Primary));
        UnifiedStore::new(
            DeduplicationConfig::default().with_mode(dedup_mode),
            Arc::new(MockEmbeddingModel),
            vec![primary],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let store = build_store(crate::dedup::DeduplicationMode::Active);
        let response = store.store("hello world", None, None).await.unwrap();
        assert!(!response.is_duplicate);

        let fetched = store.get(response.memory.id).await.unwrap();
        assert_eq!(fetched.content, "hello world");
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let store = build_store(crate::dedup::DeduplicationMode::Active);
        let err = store.store("   ", None, None).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn exact_duplicate_returns_existing_in_active_mode() {
        let store = build_store(crate::dedup::DeduplicationMode::Active);
        let first = store.store("same content", None, None).await.unwrap();
        let second = store.store("same content", None, None).await.unwrap();

        assert!(second.is_duplicate);
        assert_eq!(second.memory.id, first.memory.id);
    }

    #[tokio::test]
    async fn log_only_mode_stores_duplicates_as_new_records() {
        let store = build_store(crate::dedup::DeduplicationMode::LogOnly);
        let first = store.store("same content", None, None).await.unwrap();
        let second = store.store("same content", None, None).await.unwrap();

        assert!(!second.is_duplicate);
        assert_ne!(second.memory.id, first.memory.id);
    }

    #[tokio::test]
    async fn empty_query_uses_recent_mode() {
        let store = build_store(crate::dedup::DeduplicationMode::Active);
        store.store("a", None, None).await.unwrap();
        store.store("b", None, None).await.unwrap();

        let response = store.query("", 10, 0.0, None).await.unwrap();
        assert_eq!(response.mode, QueryMode::Recent);
        assert_eq!(response.results.len(), 2);
        assert!(response.results.iter().all(|m| m.similarity_score.is_none()));
    }

    #[tokio::test]
    async fn primary_store_failure_surfaces_storage_unavailable() {
        let primary = Arc::new(MockProvider::failing(ProviderKind::Primary));
        let store = UnifiedStore::new(
            DeduplicationConfig::default(),
            Arc::new(MockEmbeddingModel),
            vec![primary],
        )
        .unwrap();

        let err = store.store("will fail", None, None).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::StorageUnavailable);
    }

    #[tokio::test]
    async fn secondary_outage_does_not_fail_the_store() {
        let primary = Arc::new(MockProvider::new(ProviderKind::Primary));
        let secondary = Arc::new(MockProvider::failing(ProviderKind::Secondary));
        let store = UnifiedStore::new(
            DeduplicationConfig::default(),
            Arc::new(MockEmbeddingModel),
            vec![primary, secondary],
        )
        .unwrap();

        let response = store.store("resilient", None, None).await.unwrap();
        assert!(!response.is_duplicate);
    }

    #[tokio::test]
    async fn health_check_reports_worst_provider_status() {
        let store = build_store(crate::dedup::DeduplicationMode::Active);
        let health = store.health_check().await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
    }
}
