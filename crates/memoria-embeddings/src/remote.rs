//! Remote `EmbeddingModel`, backed by an OpenAI-compatible embeddings API.
//!
//! Adapted from the teacher's `OpenAIEmbedder`: same `async-openai` client
//! construction (API key from config or `OPENAI_API_KEY`, optional custom
//! base URL), generalized to the new `EmbeddingModel` trait and wrapped in
//! the retry/timeout policy the teacher didn't need for a library-only
//! embedder but this service's external-dependency posture requires: three
//! attempts with `backon` exponential backoff (1s, 2s, 4s), the whole call
//! bounded by an outer 30s deadline, surfacing `EmbeddingUnavailable` once
//! exhausted.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};

use memoria_core::error::{MemoriaError, MemoriaResult};
use memoria_core::traits::{EmbeddingModel, HealthStatus, ProviderHealth};

const OUTER_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the remote embedding model.
#[derive(Debug, Clone)]
pub struct RemoteEmbeddingConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub dimension: usize,
}

impl Default for RemoteEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }
}

/// Embedding model backed by a remote API, with bounded retry on failure.
pub struct RemoteEmbeddingModel {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl RemoteEmbeddingModel {
    pub fn new(config: RemoteEmbeddingConfig) -> MemoriaResult<Self> {
        let api_key = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                MemoriaError::invalid_request(
                    "no API key: set OPENAI_API_KEY or pass RemoteEmbeddingConfig::api_key",
                )
            })?;

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model,
            dimension: config.dimension,
        })
    }

    async fn embed_texts(&self, inputs: EmbeddingInput) -> MemoriaResult<Vec<Vec<f32>>> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs(1))
            .with_factor(2.0)
            .with_max_times(3);

        let model = self.model.clone();
        let client = &self.client;

        let attempt = || async {
            let request = CreateEmbeddingRequestArgs::default()
                .model(model.clone())
                .input(inputs.clone())
                .build()
                .map_err(|e| MemoriaError::embedding_unavailable(format!("invalid embedding request: {}", e)))?;

            client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| MemoriaError::embedding_unavailable(format!("remote embedding call failed: {}", e)))
        };

        let response = tokio::time::timeout(OUTER_TIMEOUT, attempt.retry(backoff))
            .await
            .map_err(|_| MemoriaError::deadline_exceeded("embedding call exceeded 30s deadline"))??;

        Ok(response.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingModel for RemoteEmbeddingModel {
    async fn embed(&self, text: &str) -> MemoriaResult<Vec<f32>> {
        let embeddings = self.embed_texts(EmbeddingInput::String(text.to_string())).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MemoriaError::embedding_unavailable("remote API returned no embeddings"))
    }

    async fn embed_batch(&self, texts: &[String]) -> MemoriaResult<Vec<Vec<f32>>> {
        self.embed_texts(EmbeddingInput::StringArray(texts.to_vec())).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> MemoriaResult<ProviderHealth> {
        match self.embed("health check probe").await {
            Ok(_) => Ok(ProviderHealth {
                status: HealthStatus::Healthy,
                details: format!("remote model '{}' reachable", self.model),
            }),
            Err(e) => Ok(ProviderHealth {
                status: HealthStatus::Unavailable,
                details: format!("remote model '{}' unreachable: {}", self.model, e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_api_key_when_unset() {
        std::env::remove_var("OPENAI_API_KEY");
        let config = RemoteEmbeddingConfig::default();
        assert!(RemoteEmbeddingModel::new(config).is_err());
    }

    #[test]
    fn accepts_explicit_api_key() {
        let config = RemoteEmbeddingConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        assert!(RemoteEmbeddingModel::new(config).is_ok());
    }
}
