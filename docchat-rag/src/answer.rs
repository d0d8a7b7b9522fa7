//! Grounded answer composition.
//!
//! The [`Answerer`] places retrieved segments into a delimited prompt,
//! instructs the model to answer from that context only, and calls the
//! [`Generator`] with deterministic decoding.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, error};

use crate::document::Segment;
use crate::error::Result;
use crate::generation::{GenerationRequest, Generator};

/// Reply used when there is no context to ground an answer on.
pub const INSUFFICIENT_INFORMATION: &str =
    "I don't have enough information in this document to answer that question.";

const SYSTEM_PROMPT: &str = "You answer questions about a single document. Use only the passages \
provided by the user. If the passages do not contain the answer, say that you don't know; do not \
make up an answer.";

/// Composes context and question into a prompt and asks the model.
#[derive(Clone)]
pub struct Answerer {
    generator: Arc<dyn Generator>,
}

impl Answerer {
    /// Create an answerer backed by `generator`.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Answer `question` from `context`, in the order given.
    ///
    /// Returns [`INSUFFICIENT_INFORMATION`] without calling the model when
    /// `context` is empty.
    ///
    /// # Errors
    ///
    /// Returns the generator's error unchanged.
    pub async fn answer(&self, question: &str, context: &[Segment]) -> Result<String> {
        if context.is_empty() {
            debug!("no context retrieved, skipping generation");
            return Ok(INSUFFICIENT_INFORMATION.to_string());
        }

        let request = GenerationRequest::new(SYSTEM_PROMPT, build_prompt(question, context));
        debug!(
            provider = self.generator.name(),
            passages = context.len(),
            prompt_len = request.prompt.len(),
            "generating answer"
        );

        self.generator.generate(&request).await.map_err(|e| {
            error!(provider = self.generator.name(), error = %e, "generation failed");
            e
        })
    }
}

/// Render the user turn: numbered, delimited passages followed by the question.
pub fn build_prompt(question: &str, context: &[Segment]) -> String {
    let mut prompt = String::from("Context passages:\n\n");
    for (i, segment) in context.iter().enumerate() {
        let n = i + 1;
        let _ = writeln!(prompt, "[Passage {n}]\n{}\n[End of passage {n}]\n", segment.text.trim());
    }
    let _ = write!(prompt, "Question: {}\nAnswer:", question.trim());
    prompt
}
