//! # docchat-rag
//!
//! Per-document retrieval-augmented question answering.
//!
//! ## Overview
//!
//! Every uploaded document gets its own vector index. Indexing splits the
//! extracted text into overlapping segments, embeds them and publishes the
//! finished index under the document's id. Answering embeds the question,
//! pulls the closest segments from that one index and asks a chat model to
//! answer from those passages only.
//!
//! - [`DocumentQa`] - the pipeline: `index_document`, `answer_question`
//! - [`RecursiveChunker`] / [`FixedSizeChunker`] - segmentation
//! - [`VectorIndex`] / [`IndexRegistry`] - storage and publication
//! - [`Retriever`] / [`Answerer`] - the two halves of a question
//! - [`TextExtractor`] - file bytes to text ([`PdfExtractor`] with `pdf`)
//!
//! ## Providers
//!
//! Embedding and generation sit behind the [`Embedder`] and [`Generator`]
//! traits. With the `openai` feature (on by default) the [`openai`] module
//! provides REST clients; [`mock`] has deterministic offline doubles.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docchat_rag::{DocumentQa, RagConfig};
//! use docchat_rag::openai::{OpenAIEmbedder, OpenAIGenerator};
//!
//! let qa = DocumentQa::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(OpenAIEmbedder::from_env()?))
//!     .generator(Arc::new(OpenAIGenerator::from_env()?))
//!     .build()?;
//!
//! qa.index_document("1".into(), &text).await?;
//! let answer = qa.answer_question(&"1".into(), "Who signed the contract?").await?;
//! ```

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod registry;
pub mod retriever;

pub use answer::{Answerer, INSUFFICIENT_INFORMATION};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, reconstruct, split};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{DocumentId, ScoredSegment, Segment};
pub use embedding::{Embedder, RetryingEmbedder};
pub use error::{RagError, Result};
#[cfg(feature = "pdf")]
pub use extract::PdfExtractor;
pub use extract::TextExtractor;
pub use generation::{GenerationRequest, Generator};
pub use index::{IndexEntry, VectorIndex};
pub use pipeline::{DocumentQa, DocumentQaBuilder, IndexSummary};
pub use registry::IndexRegistry;
pub use retriever::{DEFAULT_TOP_K, Retriever};
