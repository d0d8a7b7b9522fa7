//! Embedder trait for generating vector embeddings from text.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{RagError, Result};

/// A provider that maps text to fixed-dimensionality vectors.
///
/// Implementations wrap a specific backend (OpenAI, a local model, a test
/// double) behind one async interface. [`embed`](Embedder::embed) is the
/// batch entry point and must return exactly one vector per input, in input
/// order.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::Embedder;
///
/// let vectors = embedder.embed(&["first chunk", "second chunk"]).await?;
/// assert_eq!(vectors.len(), 2);
/// ```
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    ///
    /// The default implementation sends a batch of one.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding(self.name(), "provider returned no embedding"))
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Largest number of texts accepted by one [`embed`](Embedder::embed) call.
    ///
    /// Callers embedding many texts split them into batches of this size.
    fn max_batch_size(&self) -> usize {
        usize::MAX
    }

    /// A short provider name used in logs and errors.
    fn name(&self) -> &str;
}

/// Check that a provider answered a batch with one non-empty vector per input.
pub(crate) fn check_batch(provider: &str, inputs: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != inputs {
        return Err(RagError::embedding(
            provider,
            format!("expected {inputs} embeddings, provider returned {}", vectors.len()),
        ));
    }
    if vectors.iter().any(Vec::is_empty) {
        return Err(RagError::embedding(provider, "provider returned an empty embedding"));
    }
    Ok(())
}

/// Bounded retry with exponential backoff around another [`Embedder`].
///
/// Only provider errors are retried. The core pipeline never retries on its
/// own; wrap the provider with this type at startup to opt in.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::{RetryingEmbedder, openai::OpenAIEmbedder};
///
/// let embedder = RetryingEmbedder::new(OpenAIEmbedder::from_env()?).with_max_attempts(5);
/// ```
pub struct RetryingEmbedder<E> {
    inner: E,
    max_attempts: u32,
    base_delay: Duration,
}

impl<E: Embedder> RetryingEmbedder<E> {
    /// Wrap `inner` with three attempts and a 100 ms base delay.
    pub fn new(inner: E) -> Self {
        Self { inner, max_attempts: 3, base_delay: Duration::from_millis(100) }
    }

    /// Set the total number of attempts (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the delay before the first retry; later retries double it.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

#[async_trait]
impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 1;
        loop {
            match self.inner.embed(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e @ RagError::EmbeddingProvider { .. }) if attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        provider = self.inner.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "embedding request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct Flaky {
        failures_left: AtomicU32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Embedder for Flaky {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(RagError::embedding("flaky", "rate limited"));
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn flaky(failures: u32) -> (Flaky, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (Flaky { failures_left: AtomicU32::new(failures), calls: calls.clone() }, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let (inner, calls) = flaky(2);
        let embedder = RetryingEmbedder::new(inner).with_max_attempts(3);
        let vectors = embedder.embed(&["a", "b"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let (inner, calls) = flaky(10);
        let embedder = RetryingEmbedder::new(inner).with_max_attempts(2);
        let err = embedder.embed(&["a"]).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingProvider { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn embed_query_returns_first_vector() {
        let (inner, _) = flaky(0);
        let vector = inner.embed_query("q").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0]);
    }

    #[test]
    fn check_batch_rejects_wrong_count_and_empty_vectors() {
        assert!(check_batch("p", 2, &[vec![1.0]]).is_err());
        assert!(check_batch("p", 1, &[vec![]]).is_err());
        assert!(check_batch("p", 1, &[vec![0.5]]).is_ok());
    }
}
