//! memoria-vector-stores - PRIMARY and SECONDARY vector providers for memoria.
//!
//! # Providers
//!
//! - **PRIMARY** ([`PgVectorProvider`]) — pooled Postgres + pgvector, a
//!   single non-partitioned table with one HNSW cosine index. Every store
//!   must succeed here before it is considered durable.
//! - **SECONDARY** ([`SqliteVecProvider`]) — embedded SQLite + sqlite-vec.
//!   Best-effort and may lag PRIMARY; never blocks a store or query.

mod factory;
mod pgvector_pooled;
mod sqlite_vec;

pub use factory::VectorProviderFactory;
pub use pgvector_pooled::PgVectorProvider;
pub use sqlite_vec::SqliteVecProvider;

pub use memoria_core::traits::{HealthStatus, ProviderHealth, ProviderKind, ProviderStats, VectorProvider};
