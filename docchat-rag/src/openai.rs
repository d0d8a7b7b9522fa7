//! OpenAI embedding and chat-completion providers.
//!
//! This module is only available when the `openai` feature is enabled. Both
//! clients call the REST API directly with `reqwest` and accept a base URL
//! override for OpenAI-compatible servers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::{Embedder, check_batch};
use crate::error::{RagError, Result};
use crate::generation::{GenerationRequest, Generator};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// The default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Inputs per embeddings request. The API caps a request at 2048 inputs and
/// roughly 300k tokens; 1000 default-sized segments stay under both.
pub const MAX_EMBEDDING_BATCH: usize = 1000;

/// Known output sizes; anything else should set dimensions explicitly.
fn default_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

fn api_key_from_env(provider: &str) -> Result<String> {
    let key = std::env::var("OPENAI_API_KEY").map_err(|_| {
        RagError::InvalidConfiguration(format!("{provider}: OPENAI_API_KEY is not set"))
    })?;
    Ok(key.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
}

fn validate_key(provider: &str, api_key: &str) -> Result<()> {
    if api_key.is_empty() {
        return Err(RagError::InvalidConfiguration(format!(
            "{provider}: API key must not be empty"
        )));
    }
    Ok(())
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Turn a non-success response into a readable message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

/// An [`Embedder`] backed by the OpenAI embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-ada-002`.
/// - `dimensions` – optional override, forwarded to models that support it.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::openai::OpenAIEmbedder;
///
/// let embedder = OpenAIEmbedder::new("sk-...")?.with_model("text-embedding-3-small");
/// let vectors = embedder.embed(&["hello world"]).await?;
/// ```
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    request_dimensions: Option<usize>,
}

impl OpenAIEmbedder {
    /// Create a new embedder with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        validate_key("OpenAI embeddings", &api_key)?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: default_dimensions(DEFAULT_EMBEDDING_MODEL),
            request_dimensions: None,
        })
    }

    /// Create a new embedder using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env("OpenAI embeddings")?)
    }

    /// Set the model name (e.g. `text-embedding-3-small`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if self.request_dimensions.is_none() {
            self.dimensions = default_dimensions(&self.model);
        }
        self
    }

    /// Request embeddings truncated to `dims` values.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Point the client at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Reuse an existing HTTP client (connection pool, timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Send one embeddings request for at most [`MAX_EMBEDDING_BATCH`] texts.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "embedding request failed");
                RagError::embedding("OpenAI", format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "OpenAI", %message, "embedding API error");
            return Err(RagError::embedding("OpenAI", message));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse embedding response");
            RagError::embedding("OpenAI", format!("failed to parse response: {e}"))
        })?;

        parsed.data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        check_batch("OpenAI", texts.len(), &vectors)?;
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    /// Embed `texts`, splitting them into requests of at most
    /// [`MAX_EMBEDDING_BATCH`] inputs. Vectors come back in input order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBEDDING_BATCH) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        MAX_EMBEDDING_BATCH
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

/// A [`Generator`] backed by the OpenAI chat completions API.
///
/// Sends the request's system text and prompt as a two-message conversation
/// and returns the first choice.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::openai::OpenAIGenerator;
///
/// let generator = OpenAIGenerator::from_env()?.with_model("gpt-4o-mini");
/// ```
pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIGenerator {
    /// Create a new generator with the given API key and the default chat model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        validate_key("OpenAI chat", &api_key)?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_CHAT_MODEL.into(),
        })
    }

    /// Create a new generator using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env("OpenAI chat")?)
    }

    /// Set the chat model (e.g. `gpt-4o-mini`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Reuse an existing HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            provider = "OpenAI",
            model = %self.model,
            prompt_len = request.prompt.len(),
            "chat completion"
        );

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "chat request failed");
                RagError::generation("OpenAI", format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "OpenAI", %message, "chat API error");
            return Err(RagError::generation("OpenAI", message));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse chat response");
            RagError::generation("OpenAI", format!("failed to parse response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| RagError::generation("OpenAI", "API returned no completion"))
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}
