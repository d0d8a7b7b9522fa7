//! Generator trait for language-model completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single non-streaming completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Instructions that frame the task (sent as the system message).
    pub system: String,
    /// The user turn: context passages and the question.
    pub prompt: String,
    /// Sampling temperature; `0.0` asks for deterministic decoding.
    pub temperature: f32,
}

impl GenerationRequest {
    /// Create a request with deterministic decoding.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self { system: system.into(), prompt: prompt.into(), temperature: 0.0 }
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A language model that turns a [`GenerationRequest`] into text.
///
/// Implementations must be safe to call concurrently; the pipeline holds no
/// lock while a completion is in flight.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the full completion for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// A short provider name used in logs and errors.
    fn name(&self) -> &str;
}
