//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docchat_rag::RagError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by request handlers.
///
/// Rendered as `{"detail": "..."}` with a matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rag(err) => match err {
                RagError::IndexNotFound(_) => StatusCode::NOT_FOUND,
                RagError::EmptyDocument(_) | RagError::Extraction(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                RagError::EmbeddingProvider { .. }
                | RagError::GenerationProvider { .. }
                | RagError::DimensionMismatch { .. } => StatusCode::BAD_GATEWAY,
                RagError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                RagError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
