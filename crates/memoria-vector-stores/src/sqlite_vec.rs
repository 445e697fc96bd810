//! The SECONDARY vector provider: an embedded SQLite database using the
//! sqlite-vec extension for ANN search.
//!
//! Adapted from the teacher's `SqliteVecStore`: same vec0 virtual table,
//! zero-copy float encoding, and in-memory post-filter (sqlite-vec has no
//! native JSON filtering), now fixed to a single non-partitioned table and
//! implementing `VectorProvider` with `ProviderKind::Secondary` semantics —
//! writes are best-effort and may lag PRIMARY; nothing here ever blocks a
//! store or query on the primary path.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;
use zerocopy::IntoBytes;

use memoria_core::error::{MemoriaError, MemoriaResult};
use memoria_core::traits::{HealthStatus, ProviderHealth, ProviderKind, ProviderStats, VectorProvider};
use memoria_core::types::{Filter, FilterOperator, Memory, QueryMatch};

const TABLE_NAME: &str = "memories_secondary";

/// SECONDARY provider backed by SQLite + sqlite-vec.
pub struct SqliteVecProvider {
    conn: Mutex<Connection>,
    dimension: usize,
}

impl SqliteVecProvider {
    /// Open (or create) the database at `db_path` and ensure the vec0 table
    /// exists. Use `:memory:` for an ephemeral store.
    pub fn new(db_path: &str, dimension: usize) -> MemoriaResult<Self> {
        // SAFETY: this is the documented way to register sqlite-vec with
        // rusqlite, via sqlite3_auto_extension before opening a connection.
        unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        }

        let conn = Connection::open(db_path)
            .map_err(|e| MemoriaError::provider_unavailable(format!("failed to open SECONDARY database: {}", e)))?;

        let version: String = conn
            .query_row("SELECT vec_version()", [], |row| row.get(0))
            .map_err(|e| MemoriaError::provider_unavailable(format!("sqlite-vec extension not loaded: {}", e)))?;
        tracing::debug!(version = %version, "sqlite-vec loaded");

        let provider = Self {
            conn: Mutex::new(conn),
            dimension,
        };
        provider.create_table()?;
        Ok(provider)
    }

    fn create_table(&self) -> MemoriaResult<()> {
        let conn = self.lock()?;
        let sql = format!(
            r#"CREATE VIRTUAL TABLE IF NOT EXISTS "{table}" USING vec0(
                embedding float[{dim}],
                +id TEXT PRIMARY KEY,
                +content TEXT,
                +metadata TEXT,
                +importance_score REAL,
                +created_at TEXT,
                +updated_at TEXT,
                +content_hash TEXT
            )"#,
            table = TABLE_NAME,
            dim = self.dimension
        );
        conn.execute(&sql, [])
            .map_err(|e| MemoriaError::provider_unavailable(format!("failed to create vec0 table: {}", e)))?;
        Ok(())
    }

    fn lock(&self) -> MemoriaResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY lock poisoned: {}", e)))
    }

    fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
        vector.as_bytes().to_vec()
    }

    fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_memory(
        id: String,
        content: String,
        metadata_json: String,
        importance_score: f32,
        created_at: String,
        updated_at: String,
        content_hash: String,
        embedding: Vec<f32>,
    ) -> MemoriaResult<Memory> {
        let metadata: HashMap<String, Value> = serde_json::from_str(&metadata_json).unwrap_or_default();
        let id = Uuid::parse_str(&id).map_err(|e| MemoriaError::internal(format!("corrupt SECONDARY id: {}", e)))?;
        let created_at: DateTime<Utc> = created_at
            .parse()
            .map_err(|e| MemoriaError::internal(format!("corrupt SECONDARY created_at: {}", e)))?;
        let updated_at: DateTime<Utc> = updated_at
            .parse()
            .map_err(|e| MemoriaError::internal(format!("corrupt SECONDARY updated_at: {}", e)))?;

        Ok(Memory {
            id,
            content,
            embedding,
            metadata,
            importance_score,
            created_at,
            updated_at,
            content_hash,
        })
    }

    fn matches_filter(metadata: &HashMap<String, Value>, filter: &Filter) -> bool {
        match filter {
            Filter::Condition(cond) => {
                let field_value = metadata.get(&cond.field);
                match &cond.operator {
                    FilterOperator::Eq(v) => field_value == Some(v),
                    FilterOperator::Ne(v) => field_value != Some(v),
                    FilterOperator::In(values) => field_value.map_or(false, |fv| values.contains(fv)),
                    FilterOperator::Nin(values) => field_value.map_or(true, |fv| !values.contains(fv)),
                    FilterOperator::Contains(s) => {
                        field_value.and_then(|v| v.as_str()).map_or(false, |fv| fv.contains(s))
                    }
                    FilterOperator::Icontains(s) => field_value
                        .and_then(|v| v.as_str())
                        .map_or(false, |fv| fv.to_lowercase().contains(&s.to_lowercase())),
                    FilterOperator::Gt(v) => Self::compare(field_value, v, |a, b| a > b),
                    FilterOperator::Gte(v) => Self::compare(field_value, v, |a, b| a >= b),
                    FilterOperator::Lt(v) => Self::compare(field_value, v, |a, b| a < b),
                    FilterOperator::Lte(v) => Self::compare(field_value, v, |a, b| a <= b),
                    FilterOperator::Between { min, max } => {
                        Self::compare(field_value, min, |a, b| a >= b) && Self::compare(field_value, max, |a, b| a <= b)
                    }
                    FilterOperator::IsNull => field_value.is_none(),
                    FilterOperator::IsNotNull => field_value.is_some(),
                    FilterOperator::Exists => metadata.contains_key(&cond.field),
                    FilterOperator::NotExists => !metadata.contains_key(&cond.field),
                    FilterOperator::Wildcard => true,
                }
            }
            Filter::And(filters) => filters.iter().all(|f| Self::matches_filter(metadata, f)),
            Filter::Or(filters) => filters.iter().any(|f| Self::matches_filter(metadata, f)),
            Filter::Not(inner) => !Self::matches_filter(metadata, inner),
        }
    }

    fn compare<F>(field_value: Option<&Value>, compare_to: &Value, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (field_value.and_then(|v| v.as_f64()), compare_to.as_f64()) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }
}

#[async_trait]
impl VectorProvider for SqliteVecProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Secondary
    }

    async fn store(&self, memory: &Memory) -> MemoriaResult<Uuid> {
        let conn = self.lock()?;
        let sql = format!(
            r#"INSERT OR REPLACE INTO "{}" (embedding, id, content, metadata, importance_score, created_at, updated_at, content_hash)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            TABLE_NAME
        );
        let metadata_json = serde_json::to_string(&memory.metadata)
            .map_err(|e| MemoriaError::internal(format!("failed to serialize metadata: {}", e)))?;

        conn.execute(
            &sql,
            rusqlite::params![
                Self::vector_to_bytes(&memory.embedding),
                memory.id.to_string(),
                memory.content,
                metadata_json,
                memory.importance_score,
                memory.created_at.to_rfc3339(),
                memory.updated_at.to_rfc3339(),
                memory.content_hash,
            ],
        )
        .map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY insert failed: {}", e)))?;

        Ok(memory.id)
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filters: Option<&Filter>,
        min_similarity: f32,
    ) -> MemoriaResult<Vec<QueryMatch>> {
        let conn = self.lock()?;
        let fetch_limit = if filters.is_some() { (limit * 10).max(limit) } else { limit };

        let sql = format!(
            r#"SELECT id, content, metadata, importance_score, created_at, updated_at, content_hash, embedding, distance
               FROM "{}"
               WHERE embedding MATCH ?
               ORDER BY distance
               LIMIT ?"#,
            TABLE_NAME
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY query prepare failed: {}", e)))?;

        let rows = stmt
            .query_map(
                rusqlite::params![Self::vector_to_bytes(query_embedding), fetch_limit as i64],
                |row| {
                    let id: String = row.get(0)?;
                    let content: String = row.get(1)?;
                    let metadata: String = row.get(2)?;
                    let importance_score: f32 = row.get(3)?;
                    let created_at: String = row.get(4)?;
                    let updated_at: String = row.get(5)?;
                    let content_hash: String = row.get(6)?;
                    let embedding_bytes: Vec<u8> = row.get(7)?;
                    let distance: f32 = row.get(8)?;
                    Ok((id, content, metadata, importance_score, created_at, updated_at, content_hash, embedding_bytes, distance))
                },
            )
            .map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY query failed: {}", e)))?;

        let mut matches = Vec::new();
        for row in rows {
            let (id, content, metadata, importance_score, created_at, updated_at, content_hash, embedding_bytes, distance) =
                row.map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY row read failed: {}", e)))?;

            let similarity = 1.0 / (1.0 + distance);
            if similarity < min_similarity {
                continue;
            }

            let memory = Self::row_to_memory(
                id,
                content,
                metadata.clone(),
                importance_score,
                created_at,
                updated_at,
                content_hash,
                Self::bytes_to_vector(&embedding_bytes),
            )?;

            if let Some(f) = filters {
                let parsed: HashMap<String, Value> = serde_json::from_str(&metadata).unwrap_or_default();
                if !Self::matches_filter(&parsed, f) {
                    continue;
                }
            }

            matches.push(QueryMatch {
                memory,
                similarity_score: Some(similarity),
            });
            if matches.len() >= limit {
                break;
            }
        }

        Ok(matches)
    }

    async fn recent(
        &self,
        limit: usize,
        offset: usize,
        filters: Option<&Filter>,
    ) -> MemoriaResult<Vec<QueryMatch>> {
        let conn = self.lock()?;
        let fetch_limit = if filters.is_some() { (limit * 10).max(limit) } else { limit };

        let sql = format!(
            r#"SELECT id, content, metadata, importance_score, created_at, updated_at, content_hash, embedding
               FROM "{}"
               ORDER BY created_at DESC
               LIMIT ? OFFSET ?"#,
            TABLE_NAME
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY recent prepare failed: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params![fetch_limit as i64, offset as i64], |row| {
                let id: String = row.get(0)?;
                let content: String = row.get(1)?;
                let metadata: String = row.get(2)?;
                let importance_score: f32 = row.get(3)?;
                let created_at: String = row.get(4)?;
                let updated_at: String = row.get(5)?;
                let content_hash: String = row.get(6)?;
                let embedding_bytes: Vec<u8> = row.get(7)?;
                Ok((id, content, metadata, importance_score, created_at, updated_at, content_hash, embedding_bytes))
            })
            .map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY recent failed: {}", e)))?;

        let mut memories = Vec::new();
        for row in rows {
            let (id, content, metadata, importance_score, created_at, updated_at, content_hash, embedding_bytes) =
                row.map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY row read failed: {}", e)))?;

            if let Some(f) = filters {
                let parsed: HashMap<String, Value> = serde_json::from_str(&metadata).unwrap_or_default();
                if !Self::matches_filter(&parsed, f) {
                    continue;
                }
            }

            let memory = Self::row_to_memory(
                id,
                content,
                metadata,
                importance_score,
                created_at,
                updated_at,
                content_hash,
                Self::bytes_to_vector(&embedding_bytes),
            )?;
            memories.push(QueryMatch {
                memory,
                similarity_score: None,
            });
            if memories.len() >= limit {
                break;
            }
        }

        Ok(memories)
    }

    async fn get(&self, id: Uuid) -> MemoriaResult<Option<Memory>> {
        let conn = self.lock()?;
        let sql = format!(
            r#"SELECT content, metadata, importance_score, created_at, updated_at, content_hash, embedding
               FROM "{}" WHERE id = ?"#,
            TABLE_NAME
        );

        let result = conn.query_row(&sql, [id.to_string()], |row| {
            let content: String = row.get(0)?;
            let metadata: String = row.get(1)?;
            let importance_score: f32 = row.get(2)?;
            let created_at: String = row.get(3)?;
            let updated_at: String = row.get(4)?;
            let content_hash: String = row.get(5)?;
            let embedding_bytes: Vec<u8> = row.get(6)?;
            Ok((content, metadata, importance_score, created_at, updated_at, content_hash, embedding_bytes))
        });

        match result {
            Ok((content, metadata, importance_score, created_at, updated_at, content_hash, embedding_bytes)) => {
                let memory = Self::row_to_memory(
                    id.to_string(),
                    content,
                    metadata,
                    importance_score,
                    created_at,
                    updated_at,
                    content_hash,
                    Self::bytes_to_vector(&embedding_bytes),
                )?;
                Ok(Some(memory))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MemoriaError::provider_unavailable(format!("SECONDARY get failed: {}", e))),
        }
    }

    async fn delete(&self, id: Uuid) -> MemoriaResult<bool> {
        let conn = self.lock()?;
        let sql = format!(r#"DELETE FROM "{}" WHERE id = ?"#, TABLE_NAME);
        let deleted = conn
            .execute(&sql, [id.to_string()])
            .map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY delete failed: {}", e)))?;
        Ok(deleted > 0)
    }

    async fn health_check(&self) -> MemoriaResult<ProviderHealth> {
        match self.lock() {
            Ok(conn) => match conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)) {
                Ok(_) => Ok(ProviderHealth {
                    status: HealthStatus::Healthy,
                    details: "sqlite-vec reachable".to_string(),
                }),
                Err(e) => Ok(ProviderHealth {
                    status: HealthStatus::Degraded,
                    details: format!("ping failed: {}", e),
                }),
            },
            Err(e) => Ok(ProviderHealth {
                status: HealthStatus::Unavailable,
                details: e.to_string(),
            }),
        }
    }

    async fn stats(&self) -> MemoriaResult<ProviderStats> {
        let conn = self.lock()?;
        let sql = format!(r#"SELECT COUNT(*) FROM "{}""#, TABLE_NAME);
        let total: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| MemoriaError::provider_unavailable(format!("SECONDARY stats failed: {}", e)))?;
        Ok(ProviderStats {
            total_vectors: total as u64,
            avg_query_ms: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_memory(content: &str) -> Memory {
        Memory {
            id: Uuid::new_v4(),
            content: content.to_string(),
            embedding: vec![1.0, 0.0, 0.0, 0.0],
            metadata: HashMap::new(),
            importance_score: 0.5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            content_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let provider = SqliteVecProvider::new(":memory:", 4).unwrap();
        let memory = sample_memory("hello world");
        provider.store(&memory).await.unwrap();

        let fetched = provider.get(memory.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello world");
        assert_eq!(fetched.embedding, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn query_returns_closest_first() {
        let provider = SqliteVecProvider::new(":memory:", 4).unwrap();
        let mut a = sample_memory("a");
        a.embedding = vec![1.0, 0.0, 0.0, 0.0];
        let mut b = sample_memory("b");
        b.embedding = vec![0.0, 1.0, 0.0, 0.0];
        provider.store(&a).await.unwrap();
        provider.store(&b).await.unwrap();

        let results = provider.query(&[1.0, 0.0, 0.0, 0.0], 2, None, 0.0).await.unwrap();
        assert_eq!(results[0].memory.id, a.id);
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let provider = SqliteVecProvider::new(":memory:", 4).unwrap();
        let memory = sample_memory("to delete");
        provider.store(&memory).await.unwrap();

        assert!(provider.delete(memory.id).await.unwrap());
        assert!(provider.get(memory.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn health_check_reports_healthy() {
        let provider = SqliteVecProvider::new(":memory:", 4).unwrap();
        let health = provider.health_check().await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
    }
}
