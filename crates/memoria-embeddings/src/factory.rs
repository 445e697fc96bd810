//! Factory for creating `EmbeddingModel` instances from the closed
//! `EmbeddingKind` selected in `MemoryConfig`.

use std::sync::Arc;

use memoria_core::error::MemoriaResult;
use memoria_core::traits::{EmbeddingKind, EmbeddingModel};

use crate::deterministic::DeterministicEmbeddingModel;
use crate::remote::{RemoteEmbeddingConfig, RemoteEmbeddingModel};

/// Build the `EmbeddingModel` a deployment has selected.
pub struct EmbeddingModelFactory;

impl EmbeddingModelFactory {
    pub fn create(kind: EmbeddingKind, dimension: usize) -> MemoriaResult<Arc<dyn EmbeddingModel>> {
        match kind {
            EmbeddingKind::Remote => {
                let model = RemoteEmbeddingModel::new(RemoteEmbeddingConfig {
                    dimension,
                    ..Default::default()
                })?;
                Ok(Arc::new(model))
            }
            EmbeddingKind::Deterministic => Ok(Arc::new(DeterministicEmbeddingModel::new(dimension))),
        }
    }

    /// A deterministic model for tests and offline operation.
    pub fn deterministic(dimension: usize) -> Arc<dyn EmbeddingModel> {
        Arc::new(DeterministicEmbeddingModel::new(dimension))
    }
}
