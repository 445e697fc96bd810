//! Write-time deduplication gatekeeper.
//!
//! A full rewrite of the teacher's `retrieval::dedup` (which deduplicated a
//! list of already-fetched query results post-hoc, by pairwise cosine
//! comparison) into a write-time check keyed first by content hash. The
//! teacher's `DeduplicationConfig{similarity_threshold}` shape, its
//! `strict()`/`lenient()` presets, and its standalone `cosine_similarity`
//! helper are kept and reused for the semantic-duplicate step.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How aggressively the Deduplicator blocks writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeduplicationMode {
    /// Observe and count, never block a write.
    LogOnly,
    /// Block (or report as a duplicate) exact and semantic duplicates.
    #[default]
    Active,
}

/// Configuration for the Deduplicator's semantic-duplicate check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeduplicationConfig {
    pub mode: DeduplicationMode,
    pub similarity_threshold: f32,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            mode: DeduplicationMode::default(),
            similarity_threshold: 0.95,
        }
    }
}

impl DeduplicationConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_mode(mut self, mode: DeduplicationMode) -> Self {
        self.mode = mode;
        self
    }

    /// A tighter threshold: only near-identical content is flagged.
    pub fn strict() -> Self {
        Self::default().with_threshold(0.90)
    }

    /// A looser threshold: more content is flagged as duplicate.
    pub fn lenient() -> Self {
        Self::default().with_threshold(0.98)
    }
}

/// Outcome of a deduplication check against a single piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupDecision {
    Unique,
    ExactDuplicate,
    SemanticDuplicate,
}

/// Full result of a deduplication check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupOutcome {
    pub decision: DedupDecision,
    pub existing_id: Option<Uuid>,
    pub similarity: Option<f32>,
    pub reason: String,
}

impl DedupOutcome {
    fn unique() -> Self {
        Self {
            decision: DedupDecision::Unique,
            existing_id: None,
            similarity: None,
            reason: "no matching content hash or semantic neighbor".to_string(),
        }
    }
}

/// Cosine similarity between two equal-length vectors, in `[-1, 1]`.
/// Returns `0.0` for empty or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// In-process LRU fast path in front of PRIMARY's durable content-hash
/// index. The durable side (a `content_hashes` table, uniquely keyed on the
/// hash) is owned by the PRIMARY provider's `store_with_content_hash` and is
/// what actually serializes concurrent stores of identical content — this
/// cache only saves a round trip to PRIMARY once a hash is known locally.
pub struct Deduplicator {
    config: DeduplicationConfig,
    cache: RwLock<HashMap<String, Uuid>>,
    cache_capacity: usize,
    insertion_order: RwLock<Vec<String>>,
}

impl Deduplicator {
    pub fn new(config: DeduplicationConfig) -> Self {
        Self::with_capacity(config, 50_000)
    }

    pub fn with_capacity(config: DeduplicationConfig, cache_capacity: usize) -> Self {
        Self {
            config,
            cache: RwLock::new(HashMap::new()),
            cache_capacity,
            insertion_order: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &DeduplicationConfig {
        &self.config
    }

    /// O(1) exact-duplicate lookup against the in-process cache.
    pub fn check_exact(&self, content_hash: &str) -> Option<Uuid> {
        self.cache.read().unwrap().get(content_hash).copied()
    }

    /// Record a freshly stored memory's content hash, evicting the oldest
    /// entry once the bounded cache is full.
    pub fn record(&self, content_hash: String, id: Uuid) {
        let mut cache = self.cache.write().unwrap();
        let mut order = self.insertion_order.write().unwrap();

        if cache.len() >= self.cache_capacity && !cache.contains_key(&content_hash) {
            if let Some(oldest) = order.first().cloned() {
                cache.remove(&oldest);
                order.remove(0);
            }
        }

        if !cache.contains_key(&content_hash) {
            order.push(content_hash.clone());
        }
        cache.insert(content_hash, id);
    }

    /// Decide whether `content_hash` (with `embedding`) is unique, an exact
    /// duplicate, or — via `semantic_neighbor` (the top PRIMARY match at
    /// `limit=1`, if the caller performed that lookup) — a semantic
    /// duplicate. Never blocks indefinitely: callers that cannot complete
    /// the semantic check fall back to `unique` themselves.
    pub fn check(
        &self,
        content_hash: &str,
        semantic_neighbor: Option<(Uuid, f32)>,
    ) -> DedupOutcome {
        if let Some(existing) = self.check_exact(content_hash) {
            return DedupOutcome {
                decision: DedupDecision::ExactDuplicate,
                existing_id: Some(existing),
                similarity: Some(1.0),
                reason: "content hash already stored".to_string(),
            };
        }

        if matches!(self.config.mode, DeduplicationMode::Active) {
            if let Some((id, similarity)) = semantic_neighbor {
                if similarity >= self.config.similarity_threshold {
                    return DedupOutcome {
                        decision: DedupDecision::SemanticDuplicate,
                        existing_id: Some(id),
                        similarity: Some(similarity),
                        reason: format!(
                            "cosine similarity {:.4} >= threshold {:.4}",
                            similarity, self.config.similarity_threshold
                        ),
                    };
                }
            }
        }

        DedupOutcome::unique()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_empty_is_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn exact_duplicate_detected_after_record() {
        let dedup = Deduplicator::new(DeduplicationConfig::default());
        let id = Uuid::new_v4();
        dedup.record("hash-a".to_string(), id);

        let outcome = dedup.check("hash-a", None);
        assert_eq!(outcome.decision, DedupDecision::ExactDuplicate);
        assert_eq!(outcome.existing_id, Some(id));
    }

    #[test]
    fn unique_when_hash_unseen_and_no_semantic_neighbor() {
        let dedup = Deduplicator::new(DeduplicationConfig::default());
        let outcome = dedup.check("hash-b", None);
        assert_eq!(outcome.decision, DedupDecision::Unique);
    }

    #[test]
    fn semantic_duplicate_above_threshold_in_active_mode() {
        let dedup = Deduplicator::new(DeduplicationConfig::default().with_threshold(0.9));
        let neighbor_id = Uuid::new_v4();
        let outcome = dedup.check("hash-c", Some((neighbor_id, 0.97)));
        assert_eq!(outcome.decision, DedupDecision::SemanticDuplicate);
        assert_eq!(outcome.existing_id, Some(neighbor_id));
    }

    #[test]
    fn semantic_check_skipped_in_log_only_mode() {
        let dedup = Deduplicator::new(
            DeduplicationConfig::default().with_mode(DeduplicationMode::LogOnly),
        );
        let outcome = dedup.check("hash-d", Some((Uuid::new_v4(), 0.99)));
        assert_eq!(outcome.decision, DedupDecision::Unique);
    }

    #[test]
    fn below_threshold_is_unique() {
        let dedup = Deduplicator::new(DeduplicationConfig::default().with_threshold(0.95));
        let outcome = dedup.check("hash-e", Some((Uuid::new_v4(), 0.5)));
        assert_eq!(outcome.decision, DedupDecision::Unique);
    }

    #[test]
    fn cache_evicts_oldest_when_over_capacity() {
        let dedup = Deduplicator::with_capacity(DeduplicationConfig::default(), 2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        dedup.record("a".to_string(), a);
        dedup.record("b".to_string(), b);
        dedup.record("c".to_string(), c);

        assert!(dedup.check_exact("a").is_none());
        assert_eq!(dedup.check_exact("b"), Some(b));
        assert_eq!(dedup.check_exact("c"), Some(c));
    }

    #[test]
    fn strict_and_lenient_presets() {
        assert_eq!(DeduplicationConfig::strict().similarity_threshold, 0.90);
        assert_eq!(DeduplicationConfig::lenient().similarity_threshold, 0.98);
    }
}
