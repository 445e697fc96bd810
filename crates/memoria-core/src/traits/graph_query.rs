//! Graph-specific read operations, beyond the generic `VectorProvider`
//! contract, exposed by whichever provider implements `ProviderKind::Graph`.
//!
//! These are called directly by the HTTP layer (not through UnifiedStore's
//! provider fanout), since they have no analog for PRIMARY/SECONDARY.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::MemoriaResult;
use crate::types::{ExploreResult, GraphNode, InsightsResult, PathResult};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct GraphStats {
    pub node_count: u64,
    pub relationship_count: u64,
    pub type_distribution: HashMap<String, u64>,
}

#[async_trait]
pub trait GraphQuery: Send + Sync {
    /// Nodes whose normalized name matches `pattern`.
    async fn entity_search(&self, pattern: &str, limit: usize) -> MemoriaResult<Vec<GraphNode>>;

    /// BFS from `entity_name`, returning all nodes/edges within `depth` hops
    /// (clamped to `crate::types::MAX_GRAPH_DEPTH`), ordered by decreasing
    /// `strength * importance`.
    async fn explore(&self, entity_name: &str, depth: u32) -> MemoriaResult<ExploreResult>;

    /// Shortest path by hop count between two named entities, ties broken by
    /// the higher sum of edge strengths.
    async fn path(
        &self,
        from_name: &str,
        to_name: &str,
        max_depth: u32,
    ) -> MemoriaResult<PathResult>;

    /// Entities linked to a memory and their top neighbors.
    async fn insights(&self, memory_id: Uuid) -> MemoriaResult<InsightsResult>;

    /// Force a resync of one memory's extracted entities/relationships.
    async fn resync_memory(&self, memory: &crate::types::Memory) -> MemoriaResult<()>;

    /// Node/relationship counts and a type-distribution breakdown.
    async fn graph_stats(&self) -> MemoriaResult<GraphStats>;
}
