//! Error types for memoria operations.
//!
//! Mirrors the split the rest of the workspace uses: a typed Rust enum for
//! internal propagation (`MemoriaError`) plus a stable string code
//! (`ErrorCode`) that crosses the HTTP boundary unchanged.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for memoria operations.
pub type MemoriaResult<T> = Result<T, MemoriaError>;

/// Main error type for all memoria operations.
#[derive(Error, Debug)]
pub enum MemoriaError {
    /// Malformed or semantically invalid input. Not retryable.
    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        details: HashMap<String, String>,
    },

    /// No such id/entity.
    #[error("not found: {message}")]
    NotFound { message: String, id: Option<String> },

    /// Deduplication rejected the write; the response carries the existing id.
    #[error("duplicate of {existing_id}: {reason}")]
    Duplicate {
        existing_id: String,
        similarity: Option<f32>,
        reason: String,
    },

    /// Transient backend failure; the caller may retry.
    #[error("provider unavailable: {message}")]
    ProviderUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// PRIMARY write failed; never falls back silently.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding service exhausted retries.
    #[error("embedding unavailable: {message}")]
    EmbeddingUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation exceeded its timeout.
    #[error("deadline exceeded: {message}")]
    DeadlineExceeded { message: String },

    /// Unexpected fault; logged with context, opaque to the caller.
    #[error("internal error: {0}")]
    Internal(String),

    /// IO error, surfaced as internal.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error, surfaced as invalid request.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Machine-readable error codes, stable across the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRequest,
    NotFound,
    Duplicate,
    ProviderUnavailable,
    StorageUnavailable,
    EmbeddingUnavailable,
    DeadlineExceeded,
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "MEM_INVALID_REQUEST",
            ErrorCode::NotFound => "MEM_NOT_FOUND",
            ErrorCode::Duplicate => "MEM_DUPLICATE",
            ErrorCode::ProviderUnavailable => "MEM_PROVIDER_UNAVAILABLE",
            ErrorCode::StorageUnavailable => "MEM_STORAGE_UNAVAILABLE",
            ErrorCode::EmbeddingUnavailable => "MEM_EMBEDDING_UNAVAILABLE",
            ErrorCode::DeadlineExceeded => "MEM_DEADLINE_EXCEEDED",
            ErrorCode::Internal => "MEM_INTERNAL",
        }
    }
}

impl MemoriaError {
    /// Create an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Create an invalid-request error carrying field-level detail.
    pub fn invalid_request_with_details(
        message: impl Into<String>,
        details: HashMap<String, String>,
    ) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            details,
        }
    }

    /// Create a not-found error for a given id.
    pub fn not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NotFound {
            message: format!("no record with id '{}'", id),
            id: Some(id),
        }
    }

    /// Create a duplicate error.
    pub fn duplicate(
        existing_id: impl Into<String>,
        similarity: Option<f32>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            existing_id: existing_id.into(),
            similarity,
            reason: reason.into(),
        }
    }

    /// Create a provider-unavailable error.
    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage-unavailable error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an embedding-unavailable error.
    pub fn embedding_unavailable(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a deadline-exceeded error.
    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::DeadlineExceeded {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Duplicate { .. } => ErrorCode::Duplicate,
            Self::ProviderUnavailable { .. } => ErrorCode::ProviderUnavailable,
            Self::StorageUnavailable { .. } => ErrorCode::StorageUnavailable,
            Self::EmbeddingUnavailable { .. } => ErrorCode::EmbeddingUnavailable,
            Self::DeadlineExceeded { .. } => ErrorCode::DeadlineExceeded,
            Self::Internal(_) | Self::Io(_) | Self::Serialization(_) => ErrorCode::Internal,
        }
    }

    /// Whether a caller may usefully retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::DeadlineExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_code() {
        let err = MemoriaError::invalid_request("content must not be empty");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.code().as_str(), "MEM_INVALID_REQUEST");
    }

    #[test]
    fn not_found_carries_id() {
        let err = MemoriaError::not_found("abc-123");
        match err {
            MemoriaError::NotFound { id, .. } => assert_eq!(id.as_deref(), Some("abc-123")),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn provider_unavailable_is_retryable() {
        let err = MemoriaError::provider_unavailable("pool exhausted");
        assert!(err.is_retryable());
        assert!(!MemoriaError::invalid_request("bad").is_retryable());
    }
}
