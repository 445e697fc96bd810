//! Factory for creating PRIMARY and SECONDARY vector providers from
//! environment-driven configuration.

use std::sync::Arc;

use memoria_core::error::MemoriaResult;
use memoria_core::traits::VectorProvider;

use crate::pgvector_pooled::PgVectorProvider;
use crate::sqlite_vec::SqliteVecProvider;

/// Builds the PRIMARY provider: pooled Postgres + pgvector.
pub struct VectorProviderFactory;

impl VectorProviderFactory {
    /// Connect to PRIMARY and bring its schema up to date.
    pub async fn primary(dsn: &str, dimension: usize, max_pool_size: usize) -> MemoriaResult<Arc<dyn VectorProvider>> {
        let provider = PgVectorProvider::new(dsn, dimension, max_pool_size).await?;
        Ok(Arc::new(provider))
    }

    /// Open SECONDARY: an embedded sqlite-vec database at `db_path`
    /// (`:memory:` for ephemeral/test use).
    pub fn secondary(db_path: &str, dimension: usize) -> MemoriaResult<Arc<dyn VectorProvider>> {
        let provider = SqliteVecProvider::new(db_path, dimension)?;
        Ok(Arc::new(provider))
    }
}
