//! memoria-embeddings - `EmbeddingModel` implementations for memoria.
//!
//! # Supported models
//!
//! - **Remote** — an OpenAI-compatible embeddings API, with retry/timeout.
//! - **Deterministic** — a hash-derived stable vector, for tests and
//!   offline (`EMBEDDING_PROVIDER=mock`) operation.
//!
//! # Example
//!
//! ```ignore
//! use memoria_embeddings::EmbeddingModelFactory;
//! use memoria_core::traits::EmbeddingKind;
//!
//! let model = EmbeddingModelFactory::create(EmbeddingKind::Remote, 1536)?;
//! ```

mod deterministic;
mod factory;
mod remote;

pub use deterministic::DeterministicEmbeddingModel;
pub use factory::EmbeddingModelFactory;
pub use remote::{RemoteEmbeddingConfig, RemoteEmbeddingModel};

pub use memoria_core::traits::{EmbeddingKind, EmbeddingModel};
