//! The `EmbeddingModel` contract: turn text into a fixed-dimension vector.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoriaResult;
use crate::traits::health::{HealthStatus, ProviderHealth};

/// Which `EmbeddingModel` implementation a deployment has selected. The set
/// is closed: a remote API-backed model and a deterministic offline model
/// are the only two this service recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    #[default]
    Remote,
    Deterministic,
}

/// Core EmbeddingModel trait — both recognized implementations conform to this.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> MemoriaResult<Vec<f32>>;

    /// Generate embeddings for multiple texts. Default implementation
    /// embeds sequentially; implementations with a native batch API should
    /// override this.
    async fn embed_batch(&self, texts: &[String]) -> MemoriaResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Fixed output dimension `D` this model produces.
    fn dimension(&self) -> usize;

    /// Model identifier, surfaced in health checks and logs.
    fn model_name(&self) -> &str;

    /// Health of the embedding backend.
    async fn health_check(&self) -> MemoriaResult<ProviderHealth> {
        Ok(ProviderHealth {
            status: HealthStatus::Healthy,
            details: self.model_name().to_string(),
        })
    }
}
