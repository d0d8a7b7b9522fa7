//! Per-document vector index using cosine similarity.
//!
//! A [`VectorIndex`] is built once from a document's segments and never
//! mutated afterwards. Replacing a document's index means building a new one
//! and publishing it through the [`IndexRegistry`](crate::registry::IndexRegistry).

use tracing::debug;

use crate::document::{DocumentId, ScoredSegment, Segment};
use crate::embedding::{Embedder, check_batch};
use crate::error::{RagError, Result};

/// A stored segment with its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// The indexed segment.
    pub segment: Segment,
    /// The segment's embedding.
    pub embedding: Vec<f32>,
}

/// An immutable collection of embedded segments for exactly one document.
///
/// All embeddings share one dimensionality. Entries keep the order of the
/// segments they were built from.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::VectorIndex;
///
/// let index = VectorIndex::build(doc_id, segments, embedder.as_ref()).await?;
/// let hits = index.search("what is the refund policy?", 4, embedder.as_ref()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct VectorIndex {
    document_id: DocumentId,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed `segments` and build an index for `document_id`.
    ///
    /// Segment texts are sent to the embedder in order, in batches of at most
    /// [`Embedder::max_batch_size`] texts.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if `segments` is empty
    /// - [`RagError::EmbeddingProvider`] if the embedder fails or returns the
    ///   wrong number of vectors
    /// - [`RagError::DimensionMismatch`] if the vectors differ in length
    pub async fn build(
        document_id: DocumentId,
        segments: Vec<Segment>,
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        if segments.is_empty() {
            return Err(RagError::EmptyDocument(document_id));
        }

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let batch_size = embedder.max_batch_size().max(1);
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let vectors = embedder.embed(batch).await?;
            check_batch(embedder.name(), batch.len(), &vectors)?;
            embeddings.extend(vectors);
        }

        let entries = segments
            .into_iter()
            .zip(embeddings)
            .map(|(segment, embedding)| IndexEntry { segment, embedding })
            .collect();
        Self::from_entries(document_id, entries)
    }

    /// Build an index from already-embedded entries.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyDocument`] if `entries` is empty
    /// - [`RagError::DimensionMismatch`] if the embeddings differ in length
    pub fn from_entries(document_id: DocumentId, entries: Vec<IndexEntry>) -> Result<Self> {
        let Some(first) = entries.first() else {
            return Err(RagError::EmptyDocument(document_id));
        };
        let dimensions = first.embedding.len();
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::DimensionMismatch {
                expected: dimensions,
                actual: bad.embedding.len(),
            });
        }

        debug!(
            document.id = %document_id,
            entries = entries.len(),
            dimensions,
            "built vector index"
        );
        Ok(Self { document_id, dimensions, entries })
    }

    /// The document this index belongs to.
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Dimensionality shared by every stored embedding.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries. Always `false` for a built index.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entries in segment order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Embed `query` and return the `k` most similar segments.
    ///
    /// # Errors
    ///
    /// Returns the embedder's error, or [`RagError::DimensionMismatch`] if
    /// the query embedding does not match the index.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredSegment>> {
        let query_embedding = embedder.embed_query(query).await?;
        self.search_vector(&query_embedding, k)
    }

    /// Return the `k` entries most similar to `query_embedding`.
    ///
    /// Results are ordered by descending cosine similarity; equal scores keep
    /// segment order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if `query_embedding` does not
    /// have [`dimensions()`](Self::dimensions) elements.
    pub fn search_vector(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredSegment>> {
        if query_embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_embedding.len(),
            });
        }

        let mut scored: Vec<ScoredSegment> = self
            .entries
            .iter()
            .map(|entry| ScoredSegment {
                segment: entry.segment.clone(),
                score: cosine_similarity(&entry.embedding, query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| a.segment.ordinal.cmp(&b.segment.ordinal))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

/// Compute cosine similarity between two vectors of equal length.
///
/// Returns 0.0 if either vector has zero magnitude or the result is not a
/// finite number (non-finite components, overflowing norms).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}
