//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`RecursiveChunker`] - windows that prefer to end at paragraph, sentence,
//!   line, then word boundaries, falling back to a hard cut
//! - [`FixedSizeChunker`] - windows cut at exactly `chunk_size` characters
//!
//! Both count sizes in characters and produce [`Segment`]s that are exact
//! spans of the input. Consecutive segments overlap, and each segment records
//! its byte offset so that [`reconstruct`] can stitch the original text back
//! together.

use crate::document::{DocumentId, Segment};
use crate::error::{RagError, Result};

/// Default window length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of characters shared by consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Break candidates, from most to least preferred. Within one level the
/// candidate closest to the window edge wins.
const BOUNDARY_LEVELS: &[&[&str]] = &[&["\n\n"], &[". ", "! ", "? "], &["\n"], &[" ", "\t"]];

/// A strategy for splitting document text into segments.
pub trait Chunker: Send + Sync {
    /// Split `text` into ordered, overlapping segments of `document_id`.
    ///
    /// Returns an empty `Vec` if `text` is empty.
    fn chunk(&self, document_id: &DocumentId, text: &str) -> Vec<Segment>;
}

/// Split `text` with the default [`RecursiveChunker`] strategy.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`] if `overlap >= chunk_size`.
pub fn split(
    document_id: &DocumentId,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Segment>> {
    let chunker = RecursiveChunker::new(chunk_size, overlap)?;
    Ok(chunker.chunk(document_id, text))
}

/// Concatenate segments with their overlapping prefixes removed.
///
/// For segments produced by any [`Chunker`] in this module this returns the
/// original text.
pub fn reconstruct(segments: &[Segment]) -> String {
    let mut text = String::new();
    let mut covered = 0usize;
    for segment in segments {
        let skip = covered.saturating_sub(segment.start);
        text.push_str(segment.text.get(skip..).unwrap_or(""));
        covered = covered.max(segment.end());
    }
    text
}

fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Splits text into fixed-size windows by character count.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50)?;
/// let segments = chunker.chunk(&"doc-1".into(), &text);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document_id: &DocumentId, text: &str) -> Vec<Segment> {
        let spans = window_spans(text, self.chunk_size, self.chunk_overlap, false);
        into_segments(document_id, text, spans)
    }
}

/// Splits text into windows that end on the most natural nearby boundary.
///
/// Each window holds at most `chunk_size` characters. Before cutting, the
/// chunker looks backwards from the window edge for a paragraph break, then a
/// sentence end, then a line break, then whitespace. A boundary is only used
/// if the resulting window keeps at least half of `chunk_size` and more than
/// `chunk_overlap` characters; otherwise the window is cut hard. The next
/// window starts `chunk_overlap` characters before the cut, moved forward to
/// the next word if that lands mid-word.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let segments = chunker.chunk(&"42".into(), &text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document_id: &DocumentId, text: &str) -> Vec<Segment> {
        let spans = window_spans(text, self.chunk_size, self.chunk_overlap, true);
        into_segments(document_id, text, spans)
    }
}

fn into_segments(document_id: &DocumentId, text: &str, spans: Vec<(usize, usize)>) -> Vec<Segment> {
    spans
        .into_iter()
        .enumerate()
        .map(|(ordinal, (start, end))| Segment {
            document_id: document_id.clone(),
            ordinal,
            start,
            text: text[start..end].to_string(),
        })
        .collect()
}

/// Compute `(start, end)` byte spans of every window.
///
/// Requires `chunk_overlap < chunk_size`. Every span is non-empty, starts
/// strictly increase, and each start lies at or before the previous end.
fn window_spans(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    prefer_boundaries: bool,
) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let hard_end = advance(text, start, chunk_size);
        if hard_end == text.len() {
            spans.push((start, hard_end));
            break;
        }

        let end = if prefer_boundaries {
            let min_end = advance(text, start, (chunk_overlap + 1).max(chunk_size / 2));
            find_boundary(text, start, min_end, hard_end).unwrap_or(hard_end)
        } else {
            hard_end
        };
        spans.push((start, end));

        let mut next = retreat(text, end, chunk_overlap, start);
        if prefer_boundaries {
            next = skip_partial_word(text, next, end);
        }
        start = next;
    }

    spans
}

/// Byte offset `chars` characters after `from`, clamped to the end of `text`.
fn advance(text: &str, from: usize, chars: usize) -> usize {
    text[from..].char_indices().nth(chars).map_or(text.len(), |(i, _)| from + i)
}

/// Byte offset `chars` characters before `from`, clamped to `floor`.
fn retreat(text: &str, from: usize, chars: usize, floor: usize) -> usize {
    if chars == 0 {
        return from;
    }
    text[floor..from].char_indices().rev().nth(chars - 1).map_or(floor, |(i, _)| floor + i)
}

/// Find the preferred window end in `min_end..=hard_end`.
///
/// Separators stay attached to the text before them.
fn find_boundary(text: &str, start: usize, min_end: usize, hard_end: usize) -> Option<usize> {
    let window = &text[start..hard_end];
    BOUNDARY_LEVELS.iter().find_map(|separators| {
        separators
            .iter()
            .filter_map(|sep| window.rfind(sep).map(|pos| start + pos + sep.len()))
            .filter(|end| *end >= min_end)
            .max()
    })
}

/// Move `from` past the first whitespace in `from..end` unless it already
/// sits at the start of a word.
fn skip_partial_word(text: &str, from: usize, end: usize) -> usize {
    let at_word_start = text[..from].chars().next_back().is_none_or(char::is_whitespace);
    if at_word_start {
        return from;
    }
    text[from..end]
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| from + i + c.len_utf8())
        .filter(|next| *next < end)
        .unwrap_or(from)
}
