//! Environment-driven configuration.
//!
//! `MemoryConfig::from_env()` reads the keys in the external-interfaces
//! section of the spec this crate implements, with `Default` providing sane
//! fallbacks. The teacher's file-based (TOML/YAML) loader is dropped:
//! nothing in this design calls for it, so the binary's only config input is
//! the environment (with `dotenvy` loading `.env` first, in `main`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dedup::{DeduplicationConfig, DeduplicationMode};
use crate::traits::EmbeddingKind;

/// Whether graph sync runs inline (bounded by a short deadline) or is
/// enqueued to a background worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphSyncMode {
    #[default]
    Inline,
    Background,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub primary_dsn: String,
    pub embedding: EmbeddingKind,
    pub embedding_dimension: usize,
    pub dedup: DeduplicationConfig,
    pub graph_enabled: bool,
    pub graph_sync_mode: GraphSyncMode,
    pub max_pool_size: u32,
    pub import_batch_size: usize,
    pub import_parallelism: usize,
    pub server_host: String,
    pub server_port: u16,
    pub secondary_db_path: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            primary_dsn: "postgres://localhost/memoria".to_string(),
            embedding: EmbeddingKind::Remote,
            embedding_dimension: 1536,
            dedup: DeduplicationConfig::default(),
            graph_enabled: true,
            graph_sync_mode: GraphSyncMode::default(),
            max_pool_size: 20,
            import_batch_size: 100,
            import_parallelism: 8,
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            secondary_db_path: PathBuf::from("./data/secondary.db"),
        }
    }
}

impl MemoryConfig {
    /// Build configuration from environment variables, falling back to
    /// `Default::default()` values for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let embedding = match std::env::var("EMBEDDING_PROVIDER").ok().as_deref() {
            Some("mock") => EmbeddingKind::Deterministic,
            Some("remote") => EmbeddingKind::Remote,
            _ => defaults.embedding,
        };

        let dedup_mode = match std::env::var("DEDUPLICATION_MODE").ok().as_deref() {
            Some("active") => DeduplicationMode::Active,
            Some("log_only") => DeduplicationMode::LogOnly,
            _ => defaults.dedup.mode,
        };

        let dedup_threshold =
            env_parse("DEDUP_SIMILARITY_THRESHOLD", defaults.dedup.similarity_threshold);

        let graph_sync_mode = match std::env::var("GRAPH_SYNC_MODE").ok().as_deref() {
            Some("background") => GraphSyncMode::Background,
            Some("inline") => GraphSyncMode::Inline,
            _ => defaults.graph_sync_mode,
        };

        Self {
            primary_dsn: std::env::var("PRIMARY_DSN").unwrap_or(defaults.primary_dsn),
            embedding,
            embedding_dimension: env_parse("EMBEDDING_DIMENSION", defaults.embedding_dimension),
            dedup: DeduplicationConfig {
                mode: dedup_mode,
                similarity_threshold: dedup_threshold,
            },
            graph_enabled: env_parse_bool("GRAPH_ENABLED", defaults.graph_enabled),
            graph_sync_mode,
            max_pool_size: env_parse("MAX_POOL_SIZE", defaults.max_pool_size),
            import_batch_size: env_parse("IMPORT_BATCH_SIZE", defaults.import_batch_size),
            import_parallelism: env_parse("IMPORT_PARALLELISM", defaults.import_parallelism),
            server_host: std::env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env_parse("SERVER_PORT", defaults.server_port),
            secondary_db_path: std::env::var("SECONDARY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.secondary_db_path),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_fallbacks() {
        let config = MemoryConfig::default();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.embedding_dimension, 1536);
        assert_eq!(config.import_parallelism, 8);
    }

    #[test]
    fn env_parse_falls_back_on_missing_or_invalid() {
        assert_eq!(env_parse::<u16>("MEMORIA_TEST_DOES_NOT_EXIST", 42), 42);
    }
}
