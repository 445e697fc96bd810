//! Integration tests across the export and import modules: a memory
//! exported to JSON Lines must parse back into an equivalent import record,
//! and a full `ImportJob` run through `UnifiedStore` must report accurate
//! success/duplicate/failure counts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream;
use memoria_core::{
    export_jsonl, parse_jsonl, run_import, CancellationFlag, EmbeddingModel, Filter, Memory,
    MemoriaResult, ProviderHealth, ProviderKind, ProviderStats, QueryMatch, RecordOutcome,
    UnifiedStore, VectorProvider,
};
use memoria_core::dedup::DeduplicationConfig;
use memoria_core::import::{ImportJob, ImportOptions};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

struct InMemoryPrimary {
    records: Mutex<HashMap<Uuid, Memory>>,
}

impl InMemoryPrimary {
    fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorProvider for InMemoryPrimary {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Primary
    }

    async fn store(&self, memory: &Memory) -> MemoriaResult<Uuid> {
        self.records.lock().await.insert(memory.id, memory.clone());
        Ok(memory.id)
    }

    async fn query(
        &self,
        _query_embedding: &[f32],
        limit: usize,
        _filters: Option<&Filter>,
        _min_similarity: f32,
    ) -> MemoriaResult<Vec<QueryMatch>> {
        let records = self.records.lock().await;
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
        let records = self.records.lock().await;
        Ok(records
            .values()
            .take(limit)
            .cloned()
            .map(|memory| QueryMatch {
                memory,
                similarity_score: None,
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> MemoriaResult<Option<Memory>> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> MemoriaResult<bool> {
        Ok(self.records.lock().await.remove(&id).is_some())
    }

    async fn health_check(&self) -> MemoriaResult<ProviderHealth> {
        Ok(ProviderHealth {
            status: memoria_core::HealthStatus::Healthy,
            details: "in-memory".to_string(),
        })
    }

    async fn stats(&self) -> MemoriaResult<ProviderStats> {
        Ok(ProviderStats {
            total_vectors: self.records.lock().await.len() as u64,
            avg_query_ms: 0.0,
        })
    }
}

struct DeterministicEmbeddingModel;

#[async_trait]
impl EmbeddingModel for DeterministicEmbeddingModel {
    async fn embed(&self, text: &str) -> MemoriaResult<Vec<f32>> {
        Ok(vec![text.len() as f32, 1.0])
    }

    fn dimension(&self) -> usize {
        2
    }

    fn model_name(&self) -> &str {
        "deterministic-test"
    }
}

fn sample_memory(content: &str) -> Memory {
    Memory::new(content, vec![0.1, 0.2], Utc::now())
}

#[tokio::test]
async fn export_then_import_round_trips_content() {
    let memories = vec![sample_memory("first memory"), sample_memory("second memory")];

    let mut buffer = Vec::new();
    let export_stats = export_jsonl(stream::iter(memories.clone()), false, true, &mut buffer)
        .await
        .unwrap();
    assert_eq!(export_stats.exported, 2);

    let text = String::from_utf8(buffer).unwrap();
    let options = ImportOptions::default();
    let records: Vec<_> = parse_jsonl(&text, &options).collect();
    assert_eq!(records.len(), 2);

    let imported_contents: Vec<String> = records
        .into_iter()
        .map(|r| r.unwrap().content)
        .collect();
    assert!(imported_contents.contains(&"first memory".to_string()));
    assert!(imported_contents.contains(&"second memory".to_string()));
}

#[tokio::test]
async fn import_job_against_unified_store_reports_accurate_counts() {
    let primary = Arc::new(InMemoryPrimary::new());
    let store = Arc::new(
        UnifiedStore::new(
            DeduplicationConfig::default(),
            Arc::new(DeterministicEmbeddingModel),
            vec![primary],
        )
        .unwrap(),
    );

    // 8 unique rows, one duplicate of the first, one malformed line.
    let text = "{\"content\": \"alpha\"}\n\
                 {\"content\": \"beta\"}\n\
                 {\"content\": \"gamma\"}\n\
                 {\"content\": \"alpha\"}\n\
                 not json at all\n";

    let options = ImportOptions {
        batch_size: 2,
        parallelism: 2,
        ..Default::default()
    };
    let records = parse_jsonl(text, &options).collect::<Vec<_>>().into_iter();

    let job = Arc::new(RwLock::new(ImportJob::new()));
    let store_for_closure = Arc::clone(&store);

    run_import(
        job.clone(),
        records,
        options,
        CancellationFlag::new(),
        move |record| {
            let store = Arc::clone(&store_for_closure);
            async move {
                match store.store(&record.content, Some(record.metadata), None).await {
                    Ok(response) if response.is_duplicate => RecordOutcome::Duplicate,
                    Ok(_) => RecordOutcome::Stored,
                    Err(e) => RecordOutcome::Failed(e.to_string()),
                }
            }
        },
    )
    .await
    .unwrap();

    let job = job.read().await;
    assert_eq!(job.total, 5);
    assert_eq!(job.succeeded, 3);
    assert_eq!(job.duplicates, 1);
    assert_eq!(job.failed, 1);
    assert_eq!(job.status, memoria_core::ImportStatus::Partial);
}
