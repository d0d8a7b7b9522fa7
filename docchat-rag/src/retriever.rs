//! Top-K retrieval over a document's published index.

use std::sync::Arc;

use tracing::debug;

use crate::document::{DocumentId, ScoredSegment, Segment};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::registry::IndexRegistry;

/// Default number of segments returned per question.
pub const DEFAULT_TOP_K: usize = 4;

/// Looks up a document's index and searches it with the question.
#[derive(Clone)]
pub struct Retriever {
    registry: Arc<IndexRegistry>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    /// Create a retriever over `registry` that embeds queries with `embedder`.
    ///
    /// `embedder` must be the one the indexes were built with.
    pub fn new(registry: Arc<IndexRegistry>, embedder: Arc<dyn Embedder>) -> Self {
        Self { registry, embedder }
    }

    /// Return the `k` segments of `document_id` most similar to `question`.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotFound`] if the document has no published index
    /// - the embedder's error if the question cannot be embedded
    pub async fn retrieve(
        &self,
        document_id: &DocumentId,
        question: &str,
        k: usize,
    ) -> Result<Vec<Segment>> {
        let scored = self.retrieve_scored(document_id, question, k).await?;
        Ok(scored.into_iter().map(|hit| hit.segment).collect())
    }

    /// Like [`retrieve`](Self::retrieve) but keeps the similarity scores.
    pub async fn retrieve_scored(
        &self,
        document_id: &DocumentId,
        question: &str,
        k: usize,
    ) -> Result<Vec<ScoredSegment>> {
        let index = self
            .registry
            .get(document_id)
            .ok_or_else(|| RagError::IndexNotFound(document_id.clone()))?;

        let hits = index.search(question, k, self.embedder.as_ref()).await?;
        debug!(
            document.id = %document_id,
            k,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "retrieved segments"
        );
        Ok(hits)
    }
}
