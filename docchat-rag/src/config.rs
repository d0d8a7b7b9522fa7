//! Configuration for the document QA pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{RagError, Result};
use crate::retriever::DEFAULT_TOP_K;

/// Configuration parameters for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of segments retrieved per question.
    pub top_k: usize,
    /// Upper bound for each embedding or generation call. `None` waits forever.
    pub provider_timeout: Option<Duration>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            provider_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `provider_timeout` is zero
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::InvalidConfiguration(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if self.provider_timeout.is_some_and(|t| t.is_zero()) {
            return Err(RagError::InvalidConfiguration(
                "provider_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of segments retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Bound every provider call by `timeout`.
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.config.provider_timeout = Some(timeout);
        self
    }

    /// Let provider calls run without a timeout.
    pub fn no_provider_timeout(mut self) -> Self {
        self.config.provider_timeout = None;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlap_not_below_size_is_rejected() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }

    #[test]
    fn zero_top_k_and_zero_timeout_are_rejected() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().provider_timeout(Duration::ZERO).build().is_err());
        assert!(RagConfig::builder().no_provider_timeout().build().is_ok());
    }
}
