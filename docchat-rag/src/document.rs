//! Data types for document identifiers, segments, and search results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle shared between the external document record and its index.
///
/// The core never interprets the contents; it only compares and displays it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create an identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for DocumentId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A contiguous span of a document's extracted text.
///
/// Segments are produced by a [`Chunker`](crate::chunking::Chunker) and are
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The document this segment was cut from.
    pub document_id: DocumentId,
    /// Position of the segment in the document, starting at 0.
    pub ordinal: usize,
    /// Byte offset of the segment's first character in the source text.
    pub start: usize,
    /// The segment text.
    pub text: String,
}

impl Segment {
    /// Byte offset one past the segment's last character in the source text.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// A retrieved [`Segment`] paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSegment {
    /// The retrieved segment.
    pub segment: Segment,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}
