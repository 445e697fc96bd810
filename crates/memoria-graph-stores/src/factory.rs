//! Factory for creating the GRAPH provider from environment-driven
//! configuration.

use std::sync::Arc;

use memoria_core::error::MemoriaResult;

use crate::postgres_graph::PostgresGraphProvider;

/// Builds the GRAPH provider: relational Postgres entity/relationship
/// store, shared connection-pool style with PRIMARY.
pub struct GraphProviderFactory;

impl GraphProviderFactory {
    /// Connect to the graph database and bring its schema up to date.
    /// Returns the concrete type so callers can coerce it to both
    /// `Arc<dyn VectorProvider>` (for provider fan-out) and
    /// `Arc<dyn GraphQuery>` (for the `/graph/*` routes).
    pub async fn connect(dsn: &str, max_pool_size: usize) -> MemoriaResult<Arc<PostgresGraphProvider>> {
        let provider = PostgresGraphProvider::new(dsn, max_pool_size).await?;
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    // Connecting requires a live Postgres instance; exercised by
    // memoria-graph-stores integration tests gated on GRAPH_DSN.
}
