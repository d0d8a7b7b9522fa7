//! Document QA pipeline orchestrator.
//!
//! [`DocumentQa`] is the entry point for the request layer. It coordinates
//! indexing (chunk → embed → build → publish) and question answering
//! (retrieve → compose → generate), bounding every provider call by the
//! configured timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat_rag::{DocumentQa, RagConfig};
//!
//! let qa = DocumentQa::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(embedder))
//!     .generator(Arc::new(generator))
//!     .build()?;
//!
//! qa.index_document("42".into(), &text).await?;
//! let answer = qa.answer_question(&"42".into(), "What is the warranty period?").await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::answer::Answerer;
use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::DocumentId;
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::index::VectorIndex;
use crate::registry::IndexRegistry;
use crate::retriever::Retriever;

/// Outcome of a successful [`DocumentQa::index_document`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    /// The indexed document.
    pub document_id: DocumentId,
    /// Number of segments stored in the index.
    pub segments: usize,
    /// Dimensionality of the stored embeddings.
    pub dimensions: usize,
    /// Whether an earlier index for the same document was replaced.
    pub replaced: bool,
}

/// The document QA pipeline.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and the
/// pipeline holds no lock across provider calls. Construct one via
/// [`DocumentQa::builder()`].
pub struct DocumentQa {
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    registry: Arc<IndexRegistry>,
    retriever: Retriever,
    answerer: Answerer,
}

impl DocumentQa {
    /// Create a new [`DocumentQaBuilder`].
    pub fn builder() -> DocumentQaBuilder {
        DocumentQaBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the registry that holds published indexes.
    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Return the retriever used for questions.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Chunk, embed and publish `text` as the index of `document_id`.
    ///
    /// Nothing is published unless every step succeeds; on failure the
    /// registry keeps serving whatever index it held before.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if `text` has no non-whitespace content
    /// - [`RagError::EmbeddingProvider`] or [`RagError::DimensionMismatch`]
    ///   from building the index
    /// - [`RagError::ProviderTimeout`] if embedding exceeds the timeout
    pub async fn index_document(
        &self,
        document_id: DocumentId,
        text: &str,
    ) -> Result<IndexSummary> {
        if text.trim().is_empty() {
            info!(document.id = %document_id, "document has no text, nothing to index");
            return Err(RagError::EmptyDocument(document_id));
        }

        let segments = self.chunker.chunk(&document_id, text);
        let segment_count = segments.len();

        let build = VectorIndex::build(document_id.clone(), segments, self.embedder.as_ref());
        let index = self
            .bounded("embedding", build)
            .await
            .map_err(|e| {
                error!(document.id = %document_id, segment_count, error = %e, "indexing failed");
                e
            })?;

        let dimensions = index.dimensions();
        let previous = self.registry.register(document_id.clone(), Arc::new(index));

        info!(document.id = %document_id, segment_count, dimensions, "indexed document");
        Ok(IndexSummary {
            document_id,
            segments: segment_count,
            dimensions,
            replaced: previous.is_some(),
        })
    }

    /// Answer `question` from the published index of `document_id`.
    ///
    /// Never mutates any index.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotFound`] if the document is not indexed
    /// - [`RagError::EmbeddingProvider`] or [`RagError::GenerationProvider`]
    /// - [`RagError::ProviderTimeout`] if a provider call exceeds the timeout
    pub async fn answer_question(
        &self,
        document_id: &DocumentId,
        question: &str,
    ) -> Result<String> {
        let retrieval = self.retriever.retrieve(document_id, question, self.config.top_k);
        let context = self
            .bounded("embedding", retrieval)
            .await
            .map_err(|e| {
                error!(document.id = %document_id, error = %e, "retrieval failed");
                e
            })?;

        let answer = self.bounded("generation", self.answerer.answer(question, &context)).await?;
        info!(
            document.id = %document_id,
            passages = context.len(),
            answer_len = answer.len(),
            "answered question"
        );
        Ok(answer)
    }

    /// Drop the index of `document_id`. Returns whether one was published.
    pub fn remove_document(&self, document_id: &DocumentId) -> bool {
        self.registry.remove(document_id).is_some()
    }

    /// Whether `document_id` has a published index.
    pub fn is_indexed(&self, document_id: &DocumentId) -> bool {
        self.registry.contains(document_id)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.config.provider_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| RagError::ProviderTimeout { operation, timeout })?,
            None => fut.await,
        }
    }
}

/// Builder for constructing a [`DocumentQa`].
///
/// `embedder` and `generator` are required. The registry defaults to a fresh
/// [`IndexRegistry`] and the chunker to a [`RecursiveChunker`] sized from the
/// config.
///
/// # Example
///
/// ```rust,ignore
/// let qa = DocumentQa::builder()
///     .config(config)
///     .embedder(Arc::new(embedder))
///     .generator(Arc::new(generator))
///     .registry(registry.clone())   // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct DocumentQaBuilder {
    config: Option<RagConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedder: Option<Arc<dyn Embedder>>,
    generator: Option<Arc<dyn Generator>>,
    registry: Option<Arc<IndexRegistry>>,
}

impl DocumentQaBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default()`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the chunker built from the config.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the generation provider.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Share an existing registry instead of creating a new one.
    pub fn registry(mut self, registry: Arc<IndexRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the [`DocumentQa`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the config is invalid or
    /// a required field is missing.
    pub fn build(self) -> Result<DocumentQa> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedder = self
            .embedder
            .ok_or_else(|| RagError::InvalidConfiguration("embedder is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::InvalidConfiguration("generator is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?),
        };
        let registry = self.registry.unwrap_or_default();

        Ok(DocumentQa {
            retriever: Retriever::new(registry.clone(), embedder.clone()),
            answerer: Answerer::new(generator),
            config,
            chunker,
            embedder,
            registry,
        })
    }
}
