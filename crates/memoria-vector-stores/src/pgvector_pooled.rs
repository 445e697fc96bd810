//! The PRIMARY vector provider: a single non-partitioned Postgres table
//! with pgvector, pooled via deadpool-postgres.
//!
//! Adapted from the teacher's `PgVectorStorePooled`: same deadpool manager
//! construction, DSN parsing, and `build_filter`-style dynamic WHERE
//! compilation, now compiling `memoria_core::types::Filter` against a fixed
//! `memories` schema instead of the teacher's per-collection JSONB
//! "payload" table. The teacher supported arbitrary collections with a
//! caller-chosen distance metric and index type; this provider is
//! deliberately narrower — one table, one HNSW cosine index, synchronous
//! startup — because the read-after-write guarantee this service requires
//! depends on there being exactly one index path to keep consistent.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use pgvector::Vector;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use memoria_core::error::{MemoriaError, MemoriaResult};
use memoria_core::traits::{HealthStatus, ProviderHealth, ProviderKind, ProviderStats, VectorProvider};
use memoria_core::types::{Filter, FilterCondition, FilterOperator, Memory, QueryMatch};

/// PRIMARY provider: pooled Postgres + pgvector, single table, single index.
pub struct PgVectorProvider {
    pool: Pool,
    dimension: usize,
}

impl PgVectorProvider {
    /// Connect, verify the `vector` extension, and synchronously bring the
    /// schema up to date — table, HNSW index, supporting b-tree/GIN indexes,
    /// and a fresh `ANALYZE` — before returning. The provider is never
    /// "enabled" with any of that still pending.
    pub async fn new(dsn: &str, dimension: usize, max_pool_size: usize) -> MemoriaResult<Self> {
        let pg_config = tokio_postgres::Config::from_str(dsn)
            .map_err(|e| MemoriaError::invalid_request(format!("invalid PRIMARY_DSN: {}", e)))?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(max_pool_size.max(5))
            .wait_timeout(Some(Duration::from_secs(10)))
            .create_timeout(Some(Duration::from_secs(10)))
            .recycle_timeout(Some(Duration::from_secs(10)))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to build PRIMARY pool: {}", e)))?;

        let provider = Self { pool, dimension };
        provider.init_schema().await?;
        Ok(provider)
    }

    async fn init_schema(&self) -> MemoriaResult<()> {
        let client = self.client().await?;

        client
            .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to enable pgvector: {}", e)))?;

        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id UUID PRIMARY KEY,
                content TEXT NOT NULL,
                embedding vector({dim}) NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                importance_score REAL NOT NULL DEFAULT 0.5,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                content_hash TEXT NOT NULL
            )
            "#,
            dim = self.dimension
        );
        client
            .execute(&create_table, &[])
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to create memories table: {}", e)))?;

        // Exactly one vector index: HNSW over cosine distance.
        client
            .execute(
                "CREATE INDEX IF NOT EXISTS memories_embedding_hnsw_idx \
                 ON memories USING hnsw (embedding vector_cosine_ops)",
                &[],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to create HNSW index: {}", e)))?;

        client
            .execute(
                "CREATE INDEX IF NOT EXISTS memories_created_at_idx ON memories (created_at DESC)",
                &[],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to create created_at index: {}", e)))?;

        client
            .execute(
                "CREATE INDEX IF NOT EXISTS memories_importance_idx ON memories (importance_score DESC)",
                &[],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to create importance index: {}", e)))?;

        client
            .execute(
                "CREATE INDEX IF NOT EXISTS memories_metadata_gin_idx ON memories USING GIN (metadata)",
                &[],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to create metadata GIN index: {}", e)))?;

        // Durable exact-dedup index: one row per content hash, naming the
        // memory that first claimed it. The PRIMARY KEY is what actually
        // serializes concurrent stores of identical content across
        // connections/restarts — the in-process Deduplicator cache is just a
        // fast path in front of this.
        client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS content_hashes (
                    content_hash TEXT PRIMARY KEY,
                    memory_id UUID NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
                    first_seen TIMESTAMPTZ NOT NULL,
                    reference_count BIGINT NOT NULL DEFAULT 1
                )
                "#,
                &[],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to create content_hashes table: {}", e)))?;

        client
            .execute("ANALYZE memories", &[])
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to analyze memories: {}", e)))?;

        Ok(())
    }

    async fn client(&self) -> MemoriaResult<deadpool_postgres::Client> {
        self.pool.get().await.map_err(|e| {
            MemoriaError::provider_unavailable(format!("PRIMARY pool exhausted or unreachable: {}", e))
        })
    }

    fn row_to_memory(row: &Row) -> Memory {
        let embedding: Vector = row.get("embedding");
        let metadata_value: serde_json::Value = row.get("metadata");
        let metadata: HashMap<String, serde_json::Value> = metadata_value
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Memory {
            id: row.get("id"),
            content: row.get("content"),
            embedding: embedding.to_vec(),
            metadata,
            importance_score: row.get("importance_score"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            content_hash: row.get("content_hash"),
        }
    }

    fn build_filter(filter: &Filter, start_idx: usize) -> (String, Vec<String>) {
        match filter {
            Filter::Condition(cond) => Self::build_condition(cond, start_idx),
            Filter::And(filters) => Self::join_filters(filters, start_idx, "AND"),
            Filter::Or(filters) => Self::join_filters(filters, start_idx, "OR"),
            Filter::Not(inner) => {
                let (inner_str, inner_params) = Self::build_filter(inner, start_idx);
                if inner_str.is_empty() {
                    (String::new(), vec![])
                } else {
                    (format!("NOT ({})", inner_str), inner_params)
                }
            }
        }
    }

    fn join_filters(filters: &[Filter], start_idx: usize, joiner: &str) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();
        let mut param_idx = start_idx;

        for f in filters {
            let (cond_str, cond_params) = Self::build_filter(f, param_idx);
            if !cond_str.is_empty() {
                param_idx += cond_params.len();
                conditions.push(cond_str);
                params.extend(cond_params);
            }
        }

        if conditions.is_empty() {
            (String::new(), vec![])
        } else {
            (format!("({})", conditions.join(&format!(" {} ", joiner))), params)
        }
    }

    /// Real top-level `memories` columns a filter can compile directly
    /// against, with the Postgres type filter operands should be cast to.
    /// Any field name not listed here is assumed to live under `metadata`.
    fn real_column(field: &str) -> Option<(&'static str, &'static str)> {
        match field {
            "importance_score" => Some(("importance_score", "real")),
            "created_at" => Some(("created_at", "timestamptz")),
            "updated_at" => Some(("updated_at", "timestamptz")),
            "content" => Some(("content", "text")),
            "content_hash" => Some(("content_hash", "text")),
            _ => None,
        }
    }

    fn build_condition(cond: &FilterCondition, param_idx: usize) -> (String, Vec<String>) {
        if let Some((column, cast)) = Self::real_column(&cond.field) {
            return Self::build_column_condition(column, cast, &cond.operator, param_idx);
        }

        let field = format!("metadata->>'{}'", cond.field);

        match &cond.operator {
            FilterOperator::Eq(value) => (format!("{} = ${}", field, param_idx), vec![unquote(value)]),
            FilterOperator::Ne(value) => (format!("{} != ${}", field, param_idx), vec![unquote(value)]),
            FilterOperator::Gt(value) => (
                format!("({})::numeric > ${}::numeric", field, param_idx),
                vec![unquote(value)],
            ),
            FilterOperator::Gte(value) => (
                format!("({})::numeric >= ${}::numeric", field, param_idx),
                vec![unquote(value)],
            ),
            FilterOperator::Lt(value) => (
                format!("({})::numeric < ${}::numeric", field, param_idx),
                vec![unquote(value)],
            ),
            FilterOperator::Lte(value) => (
                format!("({})::numeric <= ${}::numeric", field, param_idx),
                vec![unquote(value)],
            ),
            FilterOperator::Contains(text) => (format!("{} ILIKE ${}", field, param_idx), vec![format!("%{}%", text)]),
            FilterOperator::Icontains(text) => (
                format!("LOWER({}) LIKE LOWER(${})", field, param_idx),
                vec![format!("%{}%", text)],
            ),
            FilterOperator::In(values) => {
                let params: Vec<String> = values.iter().map(unquote).collect();
                let placeholders: Vec<String> = (0..params.len()).map(|i| format!("${}", param_idx + i)).collect();
                (format!("{} IN ({})", field, placeholders.join(", ")), params)
            }
            FilterOperator::Nin(values) => {
                let params: Vec<String> = values.iter().map(unquote).collect();
                let placeholders: Vec<String> = (0..params.len()).map(|i| format!("${}", param_idx + i)).collect();
                (format!("{} NOT IN ({})", field, placeholders.join(", ")), params)
            }
            FilterOperator::Between { min, max } => (
                format!(
                    "({})::numeric BETWEEN ${}::numeric AND ${}::numeric",
                    field,
                    param_idx,
                    param_idx + 1
                ),
                vec![unquote(min), unquote(max)],
            ),
            FilterOperator::IsNull => (format!("{} IS NULL", field), vec![]),
            FilterOperator::IsNotNull => (format!("{} IS NOT NULL", field), vec![]),
            FilterOperator::Exists => (format!("metadata ? '{}'", cond.field), vec![]),
            FilterOperator::NotExists => (format!("NOT (metadata ? '{}')", cond.field), vec![]),
            FilterOperator::Wildcard => (String::new(), vec![]),
        }
    }

    /// Same operator set as `build_condition`, compiled against a real
    /// column instead of a `metadata->>'...'` text extraction. `Exists`
    /// always holds and `NotExists` never does, since every listed column is
    /// `NOT NULL`.
    fn build_column_condition(
        column: &str,
        cast: &str,
        operator: &FilterOperator,
        param_idx: usize,
    ) -> (String, Vec<String>) {
        match operator {
            FilterOperator::Eq(value) => (format!("{} = ${}::{}", column, param_idx, cast), vec![unquote(value)]),
            FilterOperator::Ne(value) => (format!("{} != ${}::{}", column, param_idx, cast), vec![unquote(value)]),
            FilterOperator::Gt(value) => (format!("{} > ${}::{}", column, param_idx, cast), vec![unquote(value)]),
            FilterOperator::Gte(value) => (format!("{} >= ${}::{}", column, param_idx, cast), vec![unquote(value)]),
            FilterOperator::Lt(value) => (format!("{} < ${}::{}", column, param_idx, cast), vec![unquote(value)]),
            FilterOperator::Lte(value) => (format!("{} <= ${}::{}", column, param_idx, cast), vec![unquote(value)]),
            FilterOperator::Contains(text) => (
                format!("{}::text ILIKE ${}", column, param_idx),
                vec![format!("%{}%", text)],
            ),
            FilterOperator::Icontains(text) => (
                format!("LOWER({}::text) LIKE LOWER(${})", column, param_idx),
                vec![format!("%{}%", text)],
            ),
            FilterOperator::In(values) => {
                let params: Vec<String> = values.iter().map(unquote).collect();
                let placeholders: Vec<String> = (0..params.len())
                    .map(|i| format!("${}::{}", param_idx + i, cast))
                    .collect();
                (format!("{} IN ({})", column, placeholders.join(", ")), params)
            }
            FilterOperator::Nin(values) => {
                let params: Vec<String> = values.iter().map(unquote).collect();
                let placeholders: Vec<String> = (0..params.len())
                    .map(|i| format!("${}::{}", param_idx + i, cast))
                    .collect();
                (format!("{} NOT IN ({})", column, placeholders.join(", ")), params)
            }
            FilterOperator::Between { min, max } => (
                format!(
                    "{} BETWEEN ${}::{} AND ${}::{}",
                    column,
                    param_idx,
                    cast,
                    param_idx + 1,
                    cast
                ),
                vec![unquote(min), unquote(max)],
            ),
            FilterOperator::IsNull => (format!("{} IS NULL", column), vec![]),
            FilterOperator::IsNotNull => (format!("{} IS NOT NULL", column), vec![]),
            FilterOperator::Exists => ("TRUE".to_string(), vec![]),
            FilterOperator::NotExists => ("FALSE".to_string(), vec![]),
            FilterOperator::Wildcard => (String::new(), vec![]),
        }
    }
}

fn unquote(value: &serde_json::Value) -> String {
    value.to_string().trim_matches('"').to_string()
}

#[async_trait]
impl VectorProvider for PgVectorProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Primary
    }

    async fn store(&self, memory: &Memory) -> MemoriaResult<Uuid> {
        let mut client = self.client().await?;
        let transaction = client
            .build_transaction()
            .isolation_level(tokio_postgres::IsolationLevel::ReadCommitted)
            .start()
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to start transaction: {}", e)))?;

        let embedding = Vector::from(memory.embedding.clone());
        let metadata = serde_json::to_value(&memory.metadata)
            .map_err(|e| MemoriaError::internal(format!("failed to serialize metadata: {}", e)))?;

        transaction
            .execute(
                r#"
                INSERT INTO memories (id, content, embedding, metadata, importance_score, created_at, updated_at, content_hash)
                VALUES ($1, $2, $3::vector, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE SET
                    content = EXCLUDED.content,
                    embedding = EXCLUDED.embedding,
                    metadata = EXCLUDED.metadata,
                    importance_score = EXCLUDED.importance_score,
                    updated_at = EXCLUDED.updated_at
                "#,
                &[
                    &memory.id,
                    &memory.content,
                    &embedding,
                    &metadata,
                    &memory.importance_score,
                    &memory.created_at,
                    &memory.updated_at,
                    &memory.content_hash,
                ],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("PRIMARY insert failed: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("PRIMARY commit failed: {}", e)))?;

        Ok(memory.id)
    }

    async fn store_with_content_hash(&self, memory: &Memory) -> MemoriaResult<Uuid> {
        let mut client = self.client().await?;
        let transaction = client
            .build_transaction()
            .isolation_level(tokio_postgres::IsolationLevel::ReadCommitted)
            .start()
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to start transaction: {}", e)))?;

        // Claim the hash first. `DO UPDATE` (rather than `DO NOTHING`) is
        // what makes `RETURNING` fire on a conflict too, so either way we
        // learn which memory owns this hash without a second round trip.
        let row = transaction
            .query_one(
                r#"
                INSERT INTO content_hashes (content_hash, memory_id, first_seen, reference_count)
                VALUES ($1, $2, $3, 1)
                ON CONFLICT (content_hash) DO UPDATE SET reference_count = content_hashes.reference_count + 1
                RETURNING memory_id
                "#,
                &[&memory.content_hash, &memory.id, &memory.created_at],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("content_hash reservation failed: {}", e)))?;

        let owner: Uuid = row.get("memory_id");
        if owner != memory.id {
            // Another memory already claimed this hash; the reference_count
            // bump above still committed, but this memory itself is not
            // stored.
            transaction
                .commit()
                .await
                .map_err(|e| MemoriaError::storage_unavailable(format!("PRIMARY commit failed: {}", e)))?;
            return Ok(owner);
        }

        let embedding = Vector::from(memory.embedding.clone());
        let metadata = serde_json::to_value(&memory.metadata)
            .map_err(|e| MemoriaError::internal(format!("failed to serialize metadata: {}", e)))?;

        transaction
            .execute(
                r#"
                INSERT INTO memories (id, content, embedding, metadata, importance_score, created_at, updated_at, content_hash)
                VALUES ($1, $2, $3::vector, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE SET
                    content = EXCLUDED.content,
                    embedding = EXCLUDED.embedding,
                    metadata = EXCLUDED.metadata,
                    importance_score = EXCLUDED.importance_score,
                    updated_at = EXCLUDED.updated_at
                "#,
                &[
                    &memory.id,
                    &memory.content,
                    &embedding,
                    &metadata,
                    &memory.importance_score,
                    &memory.created_at,
                    &memory.updated_at,
                    &memory.content_hash,
                ],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("PRIMARY insert failed: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("PRIMARY commit failed: {}", e)))?;

        Ok(memory.id)
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filters: Option<&Filter>,
        min_similarity: f32,
    ) -> MemoriaResult<Vec<QueryMatch>> {
        let client = self.client().await?;
        let vector = Vector::from(query_embedding.to_vec());

        let (where_clause, filter_params) = filters.map(|f| Self::build_filter(f, 3)).unwrap_or_default();
        let where_sql = if where_clause.is_empty() {
            String::new()
        } else {
            format!("AND {}", where_clause)
        };

        let query = format!(
            r#"
            SELECT id, content, embedding, metadata, importance_score, created_at, updated_at, content_hash,
                   1 - (embedding <=> $1) AS similarity
            FROM memories
            WHERE 1 - (embedding <=> $1) >= $2 {where_sql}
            ORDER BY embedding <=> $1
            LIMIT ${limit_idx}
            "#,
            where_sql = where_sql,
            limit_idx = filter_params.len() + 3,
        );

        let limit_i64 = limit as i64;
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&vector, &min_similarity];
        for p in &filter_params {
            params.push(p);
        }
        params.push(&limit_i64);

        let rows = client
            .query(&query, &params)
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("PRIMARY query failed: {}", e)))?;

        Ok(rows
            .iter()
            .map(|row| {
                let similarity: f64 = row.get("similarity");
                QueryMatch {
                    memory: Self::row_to_memory(row),
                    similarity_score: Some(similarity as f32),
                }
            })
            .collect())
    }

    async fn recent(
        &self,
        limit: usize,
        offset: usize,
        filters: Option<&Filter>,
    ) -> MemoriaResult<Vec<QueryMatch>> {
        let client = self.client().await?;
        let (where_clause, filter_params) = filters.map(|f| Self::build_filter(f, 1)).unwrap_or_default();
        let where_sql = if where_clause.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clause)
        };

        let query = format!(
            r#"
            SELECT id, content, embedding, metadata, importance_score, created_at, updated_at, content_hash
            FROM memories
            {where_sql}
            ORDER BY created_at DESC
            LIMIT ${limit_idx} OFFSET ${offset_idx}
            "#,
            where_sql = where_sql,
            limit_idx = filter_params.len() + 1,
            offset_idx = filter_params.len() + 2,
        );

        let limit_i64 = limit as i64;
        let offset_i64 = offset as i64;
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        for p in &filter_params {
            params.push(p);
        }
        params.push(&limit_i64);
        params.push(&offset_i64);

        let rows = client
            .query(&query, &params)
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("PRIMARY recent query failed: {}", e)))?;

        Ok(rows
            .iter()
            .map(|row| QueryMatch {
                memory: Self::row_to_memory(row),
                similarity_score: None,
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> MemoriaResult<Option<Memory>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id, content, embedding, metadata, importance_score, created_at, updated_at, content_hash \
                 FROM memories WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("PRIMARY get failed: {}", e)))?;

        Ok(row.as_ref().map(Self::row_to_memory))
    }

    async fn delete(&self, id: Uuid) -> MemoriaResult<bool> {
        let client = self.client().await?;
        let deleted = client
            .execute("DELETE FROM memories WHERE id = $1", &[&id])
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("PRIMARY delete failed: {}", e)))?;
        Ok(deleted > 0)
    }

    async fn health_check(&self) -> MemoriaResult<ProviderHealth> {
        match self.pool.get().await {
            Ok(client) => match client.query_one("SELECT 1", &[]).await {
                Ok(_) => Ok(ProviderHealth {
                    status: HealthStatus::Healthy,
                    details: format!("pool size {}/{}", self.pool.status().size, self.pool.status().max_size),
                }),
                Err(e) => Ok(ProviderHealth {
                    status: HealthStatus::Degraded,
                    details: format!("ping failed: {}", e),
                }),
            },
            Err(e) => Ok(ProviderHealth {
                status: HealthStatus::Unavailable,
                details: format!("pool exhausted: {}", e),
            }),
        }
    }

    async fn stats(&self) -> MemoriaResult<ProviderStats> {
        let client = self.client().await?;
        let row = client
            .query_one("SELECT COUNT(*) AS total FROM memories", &[])
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("PRIMARY stats failed: {}", e)))?;
        let total: i64 = row.get("total");

        Ok(ProviderStats {
            total_vectors: total as u64,
            avg_query_ms: 0.0,
        })
    }
}
