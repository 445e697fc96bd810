//! Wires `MemoryConfig` into a running `UnifiedStore` plus, when enabled,
//! the GRAPH provider's query surface.
//!
//! Grounded on the teacher's `factory::create_memory`: one function per
//! config section (`create_llm`, `create_embedder`, `create_vector_store`,
//! ...) assembled into the composed type. The provider enums and matching
//! `match`-with-catch-all-error arms are gone — `MemoryConfig` names a
//! single closed `EmbeddingKind` and always wants PRIMARY + SECONDARY, with
//! GRAPH gated on one boolean, so there is nothing left to dispatch on.

use std::sync::Arc;

use memoria_core::config::MemoryConfig;
use memoria_core::error::MemoriaResult;
use memoria_core::store::UnifiedStore;
use memoria_core::traits::{GraphQuery, VectorProvider};
use memoria_embeddings::EmbeddingModelFactory;
use memoria_graph_stores::GraphProviderFactory;
use memoria_vector_stores::VectorProviderFactory;

/// Everything the server needs to answer requests: the composed store and,
/// when `graph_enabled`, a handle to the GRAPH provider's richer query API.
pub struct Backend {
    pub store: Arc<UnifiedStore>,
    pub graph: Option<Arc<dyn GraphQuery>>,
}

/// Build the backend described by `config`, connecting to PRIMARY (and, if
/// enabled, GRAPH) eagerly so startup fails fast on a bad DSN rather than on
/// the first request.
pub async fn build_backend(config: &MemoryConfig) -> MemoriaResult<Backend> {
    let embedding_model = EmbeddingModelFactory::create(config.embedding, config.embedding_dimension)?;

    let primary = VectorProviderFactory::primary(&config.primary_dsn, config.embedding_dimension, config.max_pool_size as usize).await?;
    let secondary = VectorProviderFactory::secondary(
        &config.secondary_db_path.to_string_lossy(),
        config.embedding_dimension,
    )?;

    let mut providers: Vec<Arc<dyn VectorProvider>> = vec![primary, secondary];

    let graph = if config.graph_enabled {
        let provider = GraphProviderFactory::connect(&config.primary_dsn, config.max_pool_size as usize).await?;
        providers.push(provider.clone());
        Some(provider as Arc<dyn GraphQuery>)
    } else {
        None
    };

    let store = Arc::new(UnifiedStore::new(config.dedup.clone(), embedding_model, providers)?);

    Ok(Backend { store, graph })
}
