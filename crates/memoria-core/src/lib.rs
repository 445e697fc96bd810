//! memoria-core - Core types, traits, and orchestration for memoria, a
//! long-term memory service for AI agents.
//!
//! This crate defines the data model (`Memory`, graph types), the provider
//! contracts (`VectorProvider`, `EmbeddingModel`, `GraphQuery`), the
//! write-time `Deduplicator`, environment-driven `MemoryConfig`, and the
//! `UnifiedStore` orchestrator that composes all of the above into the
//! store/query algorithm. Concrete providers (Postgres, SQLite, embedding
//! backends) live in their own crates and implement these traits.
//!
//! # Example
//!
//! ```ignore
//! use memoria_core::{MemoryConfig, UnifiedStore};
//!
//! let config = MemoryConfig::from_env();
//! let store = UnifiedStore::new(config.dedup.clone(), embedding_model, vec![primary]);
//! let response = store.store("likes pizza", None).await?;
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod export;
pub mod import;
pub mod store;
pub mod traits;
pub mod types;

pub use config::{GraphSyncMode, MemoryConfig};
pub use dedup::{DedupDecision, DedupOutcome, DeduplicationConfig, DeduplicationMode, Deduplicator};
pub use error::{ErrorCode, MemoriaError, MemoriaResult};
pub use store::{StoreCounters, UnifiedStore};
pub use traits::{
    EmbeddingKind, EmbeddingModel, GraphQuery, GraphStats, HealthStatus, ProviderHealth,
    ProviderKind, ProviderStats, VectorProvider,
};
pub use types::{
    clamp_graph_depth, content_hash, normalize_content, ExploreResult, Filter, FilterCondition,
    FilterOperator, GraphEdge, GraphNode, GraphRelationship, InsightsResult, Memory,
    MemoryEntityLink, PathResult, QueryMatch, QueryMode, QueryResponse, StoreResponse,
    MAX_GRAPH_DEPTH,
};

pub use export::{export_csv, export_jsonl, wrap_gdpr, ExportFormat, ExportStats, ExportableMemory, GdprEnvelope};
pub use import::{
    parse_csv, parse_json, parse_jsonl, run_import, CancellationFlag, ImportFormat, ImportJob,
    ImportOptions, ImportRecord, ImportRecordError, ImportStatus, ImportableMemory, RecordOutcome,
};
