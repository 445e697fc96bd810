//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    // Common error constructors
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

/// Map a core `MemoriaError` onto the HTTP status/code pairs the API
/// contract promises: 400 invalid, 404 not found, 409 duplicate, 503
/// provider unavailable, 500 unexpected.
impl From<memoria_core::error::MemoriaError> for ApiError {
    fn from(err: memoria_core::error::MemoriaError) -> Self {
        use memoria_core::error::MemoriaError;

        match err {
            MemoriaError::InvalidRequest { message, details } => {
                let mut api_err = ApiError::bad_request(message);
                if !details.is_empty() {
                    api_err = api_err.with_details(serde_json::json!(details));
                }
                api_err
            }
            MemoriaError::NotFound { message, .. } => ApiError::not_found(message),
            MemoriaError::Duplicate {
                existing_id,
                similarity,
                reason,
            } => ApiError::conflict(reason).with_details(serde_json::json!({
                "existing_id": existing_id,
                "similarity": similarity,
            })),
            MemoriaError::ProviderUnavailable { message, .. } => ApiError::service_unavailable(message),
            MemoriaError::StorageUnavailable { message, .. } => ApiError::service_unavailable(message),
            MemoriaError::EmbeddingUnavailable { message, .. } => ApiError::service_unavailable(message),
            MemoriaError::DeadlineExceeded { message } => ApiError::service_unavailable(message),
            MemoriaError::Internal(msg) => ApiError::internal(msg),
            MemoriaError::Io(e) => ApiError::internal(format!("IO error: {}", e)),
            MemoriaError::Serialization(e) => ApiError::validation(format!("serialization error: {}", e)),
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
