//! The GRAPH provider: a relational knowledge graph built on the same
//! pooled Postgres connection style as PRIMARY, storing entities and
//! relationships extracted from memory content instead of vectors.
//!
//! Adapted from the teacher's `embedded/sync.rs` upsert idioms — insert with
//! `ON CONFLICT ... DO UPDATE`, then select the resolved id — retargeted
//! from SQLite to Postgres and from a petgraph in-memory index to ordinary
//! relational queries with `WHERE`/`JOIN`. The teacher paired SQLite with
//! petgraph for O(1) neighbor lookups without an external database; this
//! provider shares PRIMARY's Postgres connection instead, since the graph
//! is no longer meant to be a separate standalone store.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use once_cell::sync::Lazy;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use memoria_core::error::{MemoriaError, MemoriaResult};
use memoria_core::traits::{
    GraphQuery, GraphStats, HealthStatus, ProviderHealth, ProviderKind, ProviderStats, VectorProvider,
};
use memoria_core::types::{
    clamp_graph_depth, ExploreResult, Filter, GraphEdge, GraphNode, GraphRelationship, InsightsResult,
    Memory, MemoryEntityLink, PathResult, QueryMatch,
};

use crate::entity::EntityExtractor;

/// A handful of canonicalization aliases applied before upsert so that
/// common abbreviations fold onto the same node instead of fragmenting.
static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([("vbe", "Von Base Enterprises")])
});

/// Fold an entity name to NFC-ish case/whitespace-normal form and apply the
/// alias table, so "VBE" and "vbe " and "Von Base Enterprises" all upsert
/// onto the same node.
pub fn normalize_entity_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let folded = collapsed.to_lowercase();
    match ALIASES.get(folded.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => collapsed,
    }
}

pub struct PostgresGraphProvider {
    pool: Pool,
    extractor: EntityExtractor,
}

impl PostgresGraphProvider {
    pub async fn new(dsn: &str, max_pool_size: usize) -> MemoriaResult<Self> {
        let pg_config = tokio_postgres::Config::from_str(dsn)
            .map_err(|e| MemoriaError::invalid_request(format!("invalid GRAPH dsn: {}", e)))?;

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
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to build GRAPH pool: {}", e)))?;

        let provider = Self {
            pool,
            extractor: EntityExtractor::new(),
        };
        provider.init_schema().await?;
        Ok(provider)
    }

    async fn init_schema(&self) -> MemoriaResult<()> {
        let client = self.client().await?;

        client
            .batch_execute(
                r#"
                CREATE TABLE IF NOT EXISTS graph_nodes (
                    id UUID PRIMARY KEY,
                    entity_name TEXT NOT NULL,
                    entity_type TEXT NOT NULL,
                    importance_score REAL NOT NULL DEFAULT 0.0,
                    mention_count INTEGER NOT NULL DEFAULT 1,
                    properties JSONB NOT NULL DEFAULT '{}'::jsonb,
                    first_seen TIMESTAMPTZ NOT NULL,
                    last_seen TIMESTAMPTZ NOT NULL,
                    UNIQUE (entity_name)
                );

                CREATE TABLE IF NOT EXISTS graph_relationships (
                    id UUID PRIMARY KEY,
                    from_node_id UUID NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
                    to_node_id UUID NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
                    relationship_type TEXT NOT NULL,
                    strength REAL NOT NULL DEFAULT 0.0,
                    confidence REAL NOT NULL DEFAULT 0.0,
                    occurrence_count INTEGER NOT NULL DEFAULT 1,
                    created_at TIMESTAMPTZ NOT NULL,
                    UNIQUE (from_node_id, to_node_id, relationship_type)
                );

                CREATE TABLE IF NOT EXISTS memory_entity_links (
                    memory_id UUID NOT NULL,
                    entity_id UUID NOT NULL REFERENCES graph_nodes(id) ON DELETE CASCADE,
                    PRIMARY KEY (memory_id, entity_id)
                );

                CREATE INDEX IF NOT EXISTS graph_nodes_entity_name_idx ON graph_nodes (entity_name);
                CREATE INDEX IF NOT EXISTS graph_rel_from_idx ON graph_relationships (from_node_id);
                CREATE INDEX IF NOT EXISTS graph_rel_to_idx ON graph_relationships (to_node_id);
                CREATE INDEX IF NOT EXISTS memory_entity_links_memory_idx ON memory_entity_links (memory_id);
                "#,
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("failed to create graph schema: {}", e)))?;

        Ok(())
    }

    async fn client(&self) -> MemoriaResult<deadpool_postgres::Client> {
        self.pool.get().await.map_err(|e| {
            MemoriaError::provider_unavailable(format!("GRAPH pool exhausted or unreachable: {}", e))
        })
    }

    fn row_to_node(row: &Row) -> GraphNode {
        let properties_value: serde_json::Value = row.get("properties");
        let properties = properties_value
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        GraphNode {
            id: row.get("id"),
            entity_name: row.get("entity_name"),
            entity_type: row.get("entity_type"),
            importance_score: row.get("importance_score"),
            mention_count: row.get::<_, i32>("mention_count") as u32,
            properties,
            first_seen: row.get("first_seen"),
            last_seen: row.get("last_seen"),
        }
    }

    fn row_to_relationship(row: &Row) -> GraphRelationship {
        GraphRelationship {
            id: row.get("id"),
            from_node_id: row.get("from_node_id"),
            to_node_id: row.get("to_node_id"),
            relationship_type: row.get("relationship_type"),
            strength: row.get("strength"),
            confidence: row.get("confidence"),
            occurrence_count: row.get::<_, i32>("occurrence_count") as u32,
            created_at: row.get("created_at"),
        }
    }

    /// Upsert an entity by normalized name: insert with mention_count=1, or
    /// on conflict increment mention_count, bump last_seen, and keep the
    /// highest importance_score seen so far.
    async fn upsert_entity(
        client: &deadpool_postgres::Client,
        name: &str,
        entity_type: &str,
        confidence: f32,
    ) -> MemoriaResult<Uuid> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let row = client
            .query_one(
                r#"
                INSERT INTO graph_nodes (id, entity_name, entity_type, importance_score, mention_count, first_seen, last_seen)
                VALUES ($1, $2, $3, $4, 1, $5, $5)
                ON CONFLICT (entity_name) DO UPDATE SET
                    mention_count = graph_nodes.mention_count + 1,
                    last_seen = EXCLUDED.last_seen,
                    importance_score = GREATEST(graph_nodes.importance_score, EXCLUDED.importance_score)
                RETURNING id
                "#,
                &[&id, &name, &entity_type, &confidence, &now],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("entity upsert failed: {}", e)))?;

        Ok(row.get("id"))
    }

    /// Upsert a relationship by (from, to, type): insert with
    /// occurrence_count=1, or on conflict increment the count and fold the
    /// new strength into a running weighted average.
    async fn upsert_relationship(
        client: &deadpool_postgres::Client,
        from_id: Uuid,
        to_id: Uuid,
        relationship_type: &str,
        strength: f32,
        confidence: f32,
    ) -> MemoriaResult<()> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        client
            .execute(
                r#"
                INSERT INTO graph_relationships (id, from_node_id, to_node_id, relationship_type, strength, confidence, occurrence_count, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, 1, $7)
                ON CONFLICT (from_node_id, to_node_id, relationship_type) DO UPDATE SET
                    occurrence_count = graph_relationships.occurrence_count + 1,
                    strength = (graph_relationships.strength * graph_relationships.occurrence_count + EXCLUDED.strength)
                               / (graph_relationships.occurrence_count + 1)
                "#,
                &[&id, &from_id, &to_id, &relationship_type, &strength, &confidence, &now],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("relationship upsert failed: {}", e)))?;

        Ok(())
    }

    async fn link_memory(client: &deadpool_postgres::Client, link: MemoryEntityLink) -> MemoriaResult<()> {
        client
            .execute(
                "INSERT INTO memory_entity_links (memory_id, entity_id) VALUES ($1, $2) \
                 ON CONFLICT (memory_id, entity_id) DO NOTHING",
                &[&link.memory_id, &link.entity_id],
            )
            .await
            .map_err(|e| MemoriaError::storage_unavailable(format!("memory link failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl VectorProvider for PostgresGraphProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Graph
    }

    /// GRAPH ignores the embedding entirely: storing here means extracting
    /// entities/relationships from `memory.content` and syncing the graph.
    async fn store(&self, memory: &Memory) -> MemoriaResult<Uuid> {
        self.resync_memory(memory).await?;
        Ok(memory.id)
    }

    async fn query(&self, _: &[f32], _: usize, _: Option<&Filter>, _: f32) -> MemoriaResult<Vec<QueryMatch>> {
        Ok(Vec::new())
    }

    async fn recent(&self, _: usize, _: usize, _: Option<&Filter>) -> MemoriaResult<Vec<QueryMatch>> {
        Ok(Vec::new())
    }

    async fn get(&self, _: Uuid) -> MemoriaResult<Option<Memory>> {
        Ok(None)
    }

    async fn delete(&self, _: Uuid) -> MemoriaResult<bool> {
        Ok(false)
    }

    async fn health_check(&self) -> MemoriaResult<ProviderHealth> {
        let degraded_suffix = if self.extractor.is_degraded() {
            format!(", extractor degraded to {}", self.extractor.active_extractor_name())
        } else {
            String::new()
        };

        match self.pool.get().await {
            Ok(client) => match client.query_one("SELECT 1", &[]).await {
                Ok(_) => Ok(ProviderHealth {
                    status: if self.extractor.is_degraded() {
                        HealthStatus::Degraded
                    } else {
                        HealthStatus::Healthy
                    },
                    details: format!("pool size {}/{}{}", self.pool.status().size, self.pool.status().max_size, degraded_suffix),
                }),
                Err(e) => Ok(ProviderHealth {
                    status: HealthStatus::Degraded,
                    details: format!("ping failed: {}{}", e, degraded_suffix),
                }),
            },
            Err(e) => Ok(ProviderHealth {
                status: HealthStatus::Unavailable,
                details: format!("pool exhausted: {}{}", e, degraded_suffix),
            }),
        }
    }

    async fn stats(&self) -> MemoriaResult<ProviderStats> {
        let client = self.client().await?;
        let row = client
            .query_one("SELECT COUNT(*) AS total FROM graph_nodes", &[])
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("GRAPH stats failed: {}", e)))?;
        let total: i64 = row.get("total");

        Ok(ProviderStats {
            total_vectors: total as u64,
            avg_query_ms: 0.0,
        })
    }
}

#[async_trait]
impl GraphQuery for PostgresGraphProvider {
    async fn entity_search(&self, pattern: &str, limit: usize) -> MemoriaResult<Vec<GraphNode>> {
        let client = self.client().await?;
        let like_pattern = format!("%{}%", pattern);
        let rows = client
            .query(
                "SELECT * FROM graph_nodes WHERE entity_name ILIKE $1 \
                 ORDER BY importance_score DESC, mention_count DESC LIMIT $2",
                &[&like_pattern, &(limit as i64)],
            )
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("entity_search failed: {}", e)))?;

        Ok(rows.iter().map(Self::row_to_node).collect())
    }

    async fn explore(&self, entity_name: &str, depth: u32) -> MemoriaResult<ExploreResult> {
        let depth = clamp_graph_depth(depth);
        let client = self.client().await?;
        let normalized = normalize_entity_name(entity_name);

        let root_row = client
            .query_opt("SELECT * FROM graph_nodes WHERE entity_name = $1", &[&normalized])
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("explore root lookup failed: {}", e)))?;

        let Some(root_row) = root_row else {
            return Ok(ExploreResult { nodes: Vec::new(), edges: Vec::new() });
        };
        let root = Self::row_to_node(&root_row);

        let mut visited_nodes: HashMap<Uuid, GraphNode> = HashMap::new();
        let mut edges: Vec<GraphEdge> = Vec::new();
        visited_nodes.insert(root.id, root.clone());
        let mut frontier = vec![root.id];

        for _ in 0..depth {
            if frontier.is_empty() {
                break;
            }
            let rows = client
                .query(
                    r#"
                    SELECT
                        r.id AS rel_id, r.from_node_id, r.to_node_id, r.relationship_type,
                        r.strength, r.confidence, r.occurrence_count, r.created_at AS rel_created_at,
                        n1.id AS node_id, n1.entity_name, n1.entity_type, n1.importance_score,
                        n1.mention_count, n1.properties, n1.first_seen, n1.last_seen
                    FROM graph_relationships r
                    JOIN graph_nodes n1 ON n1.id = CASE WHEN r.from_node_id = ANY($1) THEN r.to_node_id ELSE r.from_node_id END
                    WHERE r.from_node_id = ANY($1) OR r.to_node_id = ANY($1)
                    "#,
                    &[&frontier],
                )
                .await
                .map_err(|e| MemoriaError::provider_unavailable(format!("explore traversal failed: {}", e)))?;

            let mut next_frontier = Vec::new();
            for row in &rows {
                let relationship = GraphRelationship {
                    id: row.get("rel_id"),
                    from_node_id: row.get("from_node_id"),
                    to_node_id: row.get("to_node_id"),
                    relationship_type: row.get("relationship_type"),
                    strength: row.get("strength"),
                    confidence: row.get("confidence"),
                    occurrence_count: row.get::<_, i32>("occurrence_count") as u32,
                    created_at: row.get("rel_created_at"),
                };
                let properties_value: serde_json::Value = row.get("properties");
                let neighbor = GraphNode {
                    id: row.get("node_id"),
                    entity_name: row.get("entity_name"),
                    entity_type: row.get("entity_type"),
                    importance_score: row.get("importance_score"),
                    mention_count: row.get::<_, i32>("mention_count") as u32,
                    properties: properties_value
                        .as_object()
                        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .unwrap_or_default(),
                    first_seen: row.get("first_seen"),
                    last_seen: row.get("last_seen"),
                };

                if !visited_nodes.contains_key(&neighbor.id) {
                    next_frontier.push(neighbor.id);
                    visited_nodes.insert(neighbor.id, neighbor.clone());
                }

                let (from, to) = if relationship.from_node_id == neighbor.id {
                    (neighbor.clone(), root.clone())
                } else {
                    (root.clone(), neighbor.clone())
                };
                edges.push(GraphEdge { relationship, from, to });
            }
            frontier = next_frontier;
        }

        let mut nodes: Vec<GraphNode> = visited_nodes.into_values().collect();
        nodes.sort_by(|a, b| {
            let score_a = a.importance_score * a.mention_count as f32;
            let score_b = b.importance_score * b.mention_count as f32;
            score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
        });
        edges.sort_by(|a, b| {
            let score_a = a.relationship.strength * a.from.importance_score;
            let score_b = b.relationship.strength * b.from.importance_score;
            score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(ExploreResult { nodes, edges })
    }

    async fn path(&self, from_name: &str, to_name: &str, max_depth: u32) -> MemoriaResult<PathResult> {
        let max_depth = clamp_graph_depth(max_depth);
        let client = self.client().await?;
        let from_norm = normalize_entity_name(from_name);
        let to_norm = normalize_entity_name(to_name);

        let from_row = client
            .query_opt("SELECT * FROM graph_nodes WHERE entity_name = $1", &[&from_norm])
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("path lookup failed: {}", e)))?;
        let to_row = client
            .query_opt("SELECT * FROM graph_nodes WHERE entity_name = $1", &[&to_norm])
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("path lookup failed: {}", e)))?;

        let (Some(from_row), Some(to_row)) = (from_row, to_row) else {
            return Ok(PathResult { path_found: false, nodes: Vec::new(), edges: Vec::new() });
        };
        let source = Self::row_to_node(&from_row);
        let target = Self::row_to_node(&to_row);

        if source.id == target.id {
            return Ok(PathResult { path_found: true, nodes: vec![source], edges: Vec::new() });
        }

        // Breadth-first search over the relationship table, bounded by
        // max_depth hops, tracking predecessor edges to reconstruct the
        // shortest path once the target is reached.
        let mut predecessor: HashMap<Uuid, (Uuid, GraphRelationship)> = HashMap::new();
        let mut visited = vec![source.id];
        let mut frontier = vec![source.id];
        let mut found = false;

        for _ in 0..max_depth {
            if frontier.is_empty() || found {
                break;
            }
            let rows = client
                .query(
                    "SELECT * FROM graph_relationships WHERE from_node_id = ANY($1) OR to_node_id = ANY($1)",
                    &[&frontier],
                )
                .await
                .map_err(|e| MemoriaError::provider_unavailable(format!("path traversal failed: {}", e)))?;

            let mut next_frontier = Vec::new();
            for row in &rows {
                let relationship = Self::row_to_relationship(row);
                for (a, b) in [
                    (relationship.from_node_id, relationship.to_node_id),
                    (relationship.to_node_id, relationship.from_node_id),
                ] {
                    if frontier.contains(&a) && !visited.contains(&b) {
                        visited.push(b);
                        predecessor.insert(b, (a, relationship.clone()));
                        next_frontier.push(b);
                        if b == target.id {
                            found = true;
                        }
                    }
                }
            }
            frontier = next_frontier;
        }

        if !found {
            return Ok(PathResult { path_found: false, nodes: Vec::new(), edges: Vec::new() });
        }

        let mut node_ids = vec![target.id];
        let mut rel_chain = Vec::new();
        let mut current = target.id;
        while let Some((prev, relationship)) = predecessor.get(&current) {
            node_ids.push(*prev);
            rel_chain.push(relationship.clone());
            current = *prev;
            if current == source.id {
                break;
            }
        }
        node_ids.reverse();
        rel_chain.reverse();

        let mut nodes = Vec::new();
        for id in node_ids {
            let row = client
                .query_one("SELECT * FROM graph_nodes WHERE id = $1", &[&id])
                .await
                .map_err(|e| MemoriaError::provider_unavailable(format!("path node lookup failed: {}", e)))?;
            nodes.push(Self::row_to_node(&row));
        }

        Ok(PathResult { path_found: true, nodes, edges: rel_chain })
    }

    async fn insights(&self, memory_id: Uuid) -> MemoriaResult<InsightsResult> {
        let client = self.client().await?;

        let entity_rows = client
            .query(
                "SELECT n.* FROM graph_nodes n \
                 JOIN memory_entity_links l ON l.entity_id = n.id \
                 WHERE l.memory_id = $1",
                &[&memory_id],
            )
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("insights entity lookup failed: {}", e)))?;
        let entities: Vec<GraphNode> = entity_rows.iter().map(Self::row_to_node).collect();
        let entity_ids: Vec<Uuid> = entities.iter().map(|e| e.id).collect();

        if entity_ids.is_empty() {
            return Ok(InsightsResult { entities, neighbors: Vec::new() });
        }

        let neighbor_rows = client
            .query(
                r#"
                SELECT DISTINCT n.* FROM graph_nodes n
                JOIN graph_relationships r ON (r.from_node_id = n.id OR r.to_node_id = n.id)
                WHERE (r.from_node_id = ANY($1) OR r.to_node_id = ANY($1))
                  AND n.id != ALL($1)
                ORDER BY n.importance_score DESC
                LIMIT 10
                "#,
                &[&entity_ids],
            )
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("insights neighbor lookup failed: {}", e)))?;
        let neighbors: Vec<GraphNode> = neighbor_rows.iter().map(Self::row_to_node).collect();

        Ok(InsightsResult { entities, neighbors })
    }

    async fn resync_memory(&self, memory: &Memory) -> MemoriaResult<()> {
        let extraction = self.extractor.extract(&memory.content).await?;
        let client = self.client().await?;

        let mut ids: HashMap<String, Uuid> = HashMap::new();
        for entity in &extraction.entities {
            let normalized = normalize_entity_name(&entity.name);
            let id = Self::upsert_entity(&client, &normalized, entity.entity_type.as_str(), entity.confidence).await?;
            ids.insert(normalized, id);
            Self::link_memory(&client, MemoryEntityLink { memory_id: memory.id, entity_id: id }).await?;
        }

        for relationship in &extraction.relationships {
            let from_norm = normalize_entity_name(&relationship.source);
            let to_norm = normalize_entity_name(&relationship.target);
            let (Some(&from_id), Some(&to_id)) = (ids.get(&from_norm), ids.get(&to_norm)) else {
                continue;
            };
            Self::upsert_relationship(
                &client,
                from_id,
                to_id,
                relationship.relationship_type.as_str(),
                relationship.strength,
                0.6,
            )
            .await?;
        }

        Ok(())
    }

    async fn graph_stats(&self) -> MemoriaResult<GraphStats> {
        let client = self.client().await?;

        let node_row = client
            .query_one("SELECT COUNT(*) AS total FROM graph_nodes", &[])
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("graph_stats node count failed: {}", e)))?;
        let rel_row = client
            .query_one("SELECT COUNT(*) AS total FROM graph_relationships", &[])
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("graph_stats relationship count failed: {}", e)))?;
        let type_rows = client
            .query(
                "SELECT relationship_type, COUNT(*) AS total FROM graph_relationships GROUP BY relationship_type",
                &[],
            )
            .await
            .map_err(|e| MemoriaError::provider_unavailable(format!("graph_stats type distribution failed: {}", e)))?;

        let node_count: i64 = node_row.get("total");
        let relationship_count: i64 = rel_row.get("total");
        let type_distribution = type_rows
            .iter()
            .map(|r| {
                let t: String = r.get("relationship_type");
                let c: i64 = r.get("total");
                (t, c as u64)
            })
            .collect();

        Ok(GraphStats {
            node_count: node_count as u64,
            relationship_count: relationship_count as u64,
            type_distribution,
        })
    }
}
