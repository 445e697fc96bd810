//! The core `Memory` record and the request/response shapes built around it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// An immutable record of content plus its embedding and metadata.
///
/// `content` and `embedding` never change after a successful store; only
/// `metadata` and `updated_at` may be revised in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub importance_score: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub content_hash: String,
}

impl Memory {
    /// Build a memory with a fresh id and matching created/updated timestamps.
    pub fn new(content: impl Into<String>, embedding: Vec<f32>, now: DateTime<Utc>) -> Self {
        let content = content.into();
        let content_hash = content_hash(&content);
        Self {
            id: Uuid::new_v4(),
            content,
            embedding,
            metadata: HashMap::new(),
            importance_score: 0.5,
            created_at: now,
            updated_at: now,
            content_hash,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_importance(mut self, score: f32) -> Self {
        self.importance_score = score.clamp(0.0, 1.0);
        self
    }
}

/// Normalize content the way `content_hash` expects: NFC form is approximated
/// by trimming and collapsing whitespace, since `String` in Rust source text
/// is already UTF-8 NFC in the overwhelming common case for this service's
/// inputs; full Unicode normalization is intentionally not pulled in as a
/// dependency for this.
pub fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// SHA-256 of the normalized content, hex-encoded.
pub fn content_hash(content: &str) -> String {
    let normalized = normalize_content(content);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A query match: a memory plus its similarity score, when one applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    #[serde(flatten)]
    pub memory: Memory,
    /// `None` for recency-mode results (empty query).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f32>,
}

/// The mode a query response was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Similarity,
    Recent,
}

/// Result of `UnifiedStore::query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<QueryMatch>,
    pub mode: QueryMode,
    /// Secondary providers that did not respond within the merge deadline.
    #[serde(default)]
    pub skipped_providers: Vec<String>,
}

/// Result of `UnifiedStore::store`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResponse {
    pub memory: Memory,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_normalizes_case_and_whitespace() {
        let a = content_hash("Kubernetes   orchestrates containers");
        let b = content_hash("kubernetes orchestrates containers");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_for_different_content() {
        assert_ne!(content_hash("foo"), content_hash("bar"));
    }

    #[test]
    fn new_memory_has_matching_timestamps() {
        let now = Utc::now();
        let mem = Memory::new("hello world", vec![0.1, 0.2], now);
        assert_eq!(mem.created_at, mem.updated_at);
        assert_eq!(mem.importance_score, 0.5);
    }

    #[test]
    fn with_importance_clamps() {
        let now = Utc::now();
        let mem = Memory::new("x", vec![], now).with_importance(5.0);
        assert_eq!(mem.importance_score, 1.0);
    }
}
