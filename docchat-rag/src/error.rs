//! Error types for the `docchat-rag` crate.

use std::time::Duration;

use thiserror::Error;

use crate::document::DocumentId;

/// Errors that can occur while indexing documents or answering questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking or pipeline parameters are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The document produced no segments to index.
    #[error("Document '{0}' has no text to index")]
    EmptyDocument(DocumentId),

    /// A vector did not match the dimensionality of the index it was used with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the stored vectors.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// No index has been published for the document.
    #[error("No index found for document '{0}'")]
    IndexNotFound(DocumentId),

    /// The embedding provider failed.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingProvider {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation provider failed.
    #[error("Generation error ({provider}): {message}")]
    GenerationProvider {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A provider call did not complete within the configured timeout.
    #[error("{operation} timed out after {timeout:?}")]
    ProviderTimeout {
        /// The operation that was cut off (e.g. `embedding`, `generation`).
        operation: &'static str,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Text could not be extracted from an uploaded file.
    #[error("Extraction error: {0}")]
    Extraction(String),
}

impl RagError {
    /// Build an [`RagError::EmbeddingProvider`] error.
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingProvider { provider: provider.into(), message: message.into() }
    }

    /// Build an [`RagError::GenerationProvider`] error.
    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GenerationProvider { provider: provider.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
