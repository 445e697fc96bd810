//! Entity extraction module.
//!
//! This module provides local, no-network entity extraction from text,
//! including entity type detection and relationship inference by
//! character-window co-occurrence.
//!
//! # Components
//!
//! - `types`: Entity and relationship type definitions
//! - `extractor`: Statistical and regex entity extraction
//!
//! # Example
//!
//! ```ignore
//! use memoria_graph_stores::entity::EntityExtractor;
//!
//! let extractor = EntityExtractor::new();
//! let result = extractor.extract("Alice works at Acme Corp").await?;
//! ```

mod types;
mod extractor;

pub use types::{EntityType, RelationshipType};
pub use extractor::{EntityExtractor, ExtractedEntity, ExtractedRelationship, ExtractionResult, DEFAULT_WINDOW};
