//! memoria-graph-stores - the GRAPH provider and entity extraction for memoria.
//!
//! # Architecture
//!
//! Entities and relationships are extracted locally (no external model
//! fetch) by [`entity::EntityExtractor`], then synced into a relational
//! Postgres schema by [`PostgresGraphProvider`], which shares the same
//! pooled-connection style as PRIMARY rather than running its own embedded
//! database.

pub mod entity;
mod factory;
mod postgres_graph;

pub use factory::GraphProviderFactory;
pub use postgres_graph::{normalize_entity_name, PostgresGraphProvider};

pub use memoria_core::traits::{GraphQuery, HealthStatus, ProviderHealth, ProviderKind, VectorProvider};
