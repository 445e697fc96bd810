//! Deterministic `EmbeddingModel` for tests and offline operation.
//!
//! No teacher analog exists for a hash-derived embedder; this follows the
//! shape of [`crate::remote::RemoteEmbeddingModel`] (same trait, same
//! `health_check` default) but derives a stable pseudo-random vector from
//! the input text's SHA-256 digest instead of calling out to a model.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use memoria_core::error::MemoriaResult;
use memoria_core::traits::EmbeddingModel;

/// Produces the same vector for the same text every time, with no network
/// dependency. Used for tests and for `EMBEDDING_PROVIDER=mock` deployments.
pub struct DeterministicEmbeddingModel {
    dimension: usize,
}

impl DeterministicEmbeddingModel {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for DeterministicEmbeddingModel {
    fn default() -> Self {
        Self::new(1536)
    }
}

#[async_trait]
impl EmbeddingModel for DeterministicEmbeddingModel {
    async fn embed(&self, text: &str) -> MemoriaResult<Vec<f32>> {
        Ok(hash_embedding(text, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "deterministic"
    }
}

/// Derive a unit-norm pseudo-random vector of `dimension` floats from the
/// SHA-256 digest of `text`, re-hashing as needed to fill the vector.
fn hash_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut values = Vec::with_capacity(dimension);
    let mut counter: u32 = 0;

    while values.len() < dimension {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();

        for chunk in digest.chunks_exact(4) {
            if values.len() >= dimension {
                break;
            }
            let bits = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            // Map to [-1, 1].
            let value = (bits as f64 / u32::MAX as f64) * 2.0 - 1.0;
            values.push(value as f32);
        }
        counter += 1;
    }

    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut values {
            *v /= norm;
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_yields_same_embedding() {
        let model = DeterministicEmbeddingModel::new(16);
        let a = model.embed("hello world").await.unwrap();
        let b = model.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_text_yields_different_embedding() {
        let model = DeterministicEmbeddingModel::new(16);
        let a = model.embed("hello").await.unwrap();
        let b = model.embed("world").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn produces_requested_dimension() {
        let model = DeterministicEmbeddingModel::new(1536);
        let embedding = model.embed("x").await.unwrap();
        assert_eq!(embedding.len(), 1536);
    }

    #[tokio::test]
    async fn is_unit_norm() {
        let model = DeterministicEmbeddingModel::new(32);
        let embedding = model.embed("normalize me").await.unwrap();
        let norm: f32 = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
