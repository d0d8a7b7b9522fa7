//! Deterministic providers for tests, demos and offline runs.
//!
//! None of these touch the network. [`MockEmbedder`] produces hashed
//! bag-of-words vectors, so texts sharing words score higher against each
//! other, which is enough to exercise retrieval end to end.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::extract::TextExtractor;
use crate::generation::{GenerationRequest, Generator};

/// Hashed bag-of-words embedder.
///
/// Each lowercase alphanumeric token adds one to the bucket its FNV-1a hash
/// selects; the vector is then L2-normalized. Text without tokens maps to the
/// zero vector.
#[derive(Debug)]
pub struct MockEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
    delay: Option<Duration>,
    max_batch_size: Option<usize>,
}

impl MockEmbedder {
    /// Create an embedder producing `dimensions`-long vectors (at least 1).
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            calls: AtomicUsize::new(0),
            delay: None,
            max_batch_size: None,
        }
    }

    /// Reject batches larger than `size` texts, like a hosted API would.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size.max(1));
        self
    }

    /// Sleep for `delay` before answering each batch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of batches embedded so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let hash = fnv1a(&token.to_lowercase());
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    token.bytes().fold(OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(PRIME))
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.max_batch_size.filter(|limit| texts.len() > *limit) {
            return Err(RagError::embedding(
                "mock",
                format!("batch of {} texts exceeds the limit of {limit}", texts.len()),
            ));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size.unwrap_or(usize::MAX)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// An embedder whose every call fails with a provider error.
#[derive(Debug)]
pub struct FailingEmbedder {
    message: String,
    dimensions: usize,
}

impl FailingEmbedder {
    /// Create an embedder that fails with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), dimensions: 8 }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::embedding("failing", self.message.clone()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A generator that answers with the prompt it was given.
///
/// Records every request so tests can inspect what context reached the model.
#[derive(Debug, Default)]
pub struct EchoGenerator {
    requests: Mutex<Vec<GenerationRequest>>,
}

impl EchoGenerator {
    /// Create a generator with no recorded requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(request.clone());
        Ok(request.prompt.clone())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// A generator whose every call fails with a provider error.
#[derive(Debug)]
pub struct FailingGenerator {
    message: String,
    calls: AtomicUsize,
}

impl FailingGenerator {
    /// Create a generator that fails with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), calls: AtomicUsize::new(0) }
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::generation("failing", self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Treats uploaded bytes as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| RagError::Extraction(format!("file is not valid UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    #[tokio::test]
    async fn shared_words_score_higher() {
        let embedder = MockEmbedder::new(64);
        let vectors = embedder
            .embed(&["the invoice is due in march", "invoice due march", "penguins swim fast"])
            .await
            .unwrap();
        let related = cosine_similarity(&vectors[0], &vectors[1]);
        let unrelated = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
        assert_eq!(embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn vectors_are_deterministic_and_case_insensitive() {
        let embedder = MockEmbedder::new(32);
        let a = embedder.embed_query("Hello World").await.unwrap();
        let b = embedder.embed_query("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[tokio::test]
    async fn oversized_batches_are_rejected() {
        let embedder = MockEmbedder::new(8).with_max_batch_size(2);
        assert!(embedder.embed(&["a", "b"]).await.is_ok());
        let err = embedder.embed(&["a", "b", "c"]).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingProvider { .. }));
        assert_eq!(embedder.max_batch_size(), 2);
    }

    #[test]
    fn plain_text_extractor_rejects_invalid_utf8() {
        assert_eq!(PlainTextExtractor.extract(b"hi").unwrap(), "hi");
        assert!(matches!(PlainTextExtractor.extract(&[0xff, 0xfe]), Err(RagError::Extraction(_))));
    }
}
