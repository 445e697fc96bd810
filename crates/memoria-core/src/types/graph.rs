//! Graph data model shared between the core orchestrator and the concrete
//! relational graph provider in `memoria-graph-stores`.
//!
//! The closed entity/relationship type vocabularies live in
//! `memoria-graph-stores` (which owns the storage schema); here they are
//! carried as plain strings so this crate does not need to depend on the
//! graph-stores crate to describe the shape of a node or edge.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node in the knowledge graph: an entity mentioned by one or more memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: Uuid,
    pub entity_name: String,
    pub entity_type: String,
    pub importance_score: f32,
    pub mention_count: u32,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// An edge in the knowledge graph between two `GraphNode`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub id: Uuid,
    pub from_node_id: Uuid,
    pub to_node_id: Uuid,
    pub relationship_type: String,
    pub strength: f32,
    pub confidence: f32,
    pub occurrence_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Links a memory to the entities extracted from its content. The only path
/// from a memory to its entities; entities themselves are memory-agnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemoryEntityLink {
    pub memory_id: Uuid,
    pub entity_id: Uuid,
}

/// A single hop returned by `explore`/`path` graph traversals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub relationship: GraphRelationship,
    pub from: GraphNode,
    pub to: GraphNode,
}

/// Result of an `explore(entity_name, depth)` traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Result of a `path(from, to, max_depth)` traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathResult {
    pub path_found: bool,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphRelationship>,
}

/// Result of an `insights(memory_id)` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsResult {
    pub entities: Vec<GraphNode>,
    pub neighbors: Vec<GraphNode>,
}

/// Clamp a requested traversal depth to the service-wide DoS guard.
pub const MAX_GRAPH_DEPTH: u32 = 5;

pub fn clamp_graph_depth(requested: u32) -> u32 {
    requested.clamp(1, MAX_GRAPH_DEPTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_depth_above_max() {
        assert_eq!(clamp_graph_depth(50), MAX_GRAPH_DEPTH);
    }

    #[test]
    fn clamps_depth_below_min() {
        assert_eq!(clamp_graph_depth(0), 1);
    }

    #[test]
    fn leaves_valid_depth_untouched() {
        assert_eq!(clamp_graph_depth(3), 3);
    }
}
