//! Generation capability
//!
//! The vision-language model is opaque to the pipeline: given a prompt it
//! returns one completion. Backends live in `llm_bridge`; tests use stubs.

use crate::error::Result;
use crate::types::{Candidate, Prompt};
use async_trait::async_trait;

/// Chat-template markers some backends leak into decoded text
const SPECIAL_TOKENS: &[&str] = &[
    "<|im_start|>",
    "<|im_end|>",
    "<|endoftext|>",
    "<|vision_start|>",
    "<|vision_end|>",
    "<|image_pad|>",
    "<|eot_id|>",
    "<s>",
    "</s>",
];

/// A model that turns a multimodal prompt into one candidate review.
///
/// Implementations are built once at startup and shared read-only between
/// requests. Every call samples with the implementation's fixed
/// [`GenerationParams`](crate::GenerationParams). Any backend fault must be
/// reported as [`PipelineError::Inference`](crate::PipelineError::Inference).
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Produce one completion containing only newly generated text
    async fn generate(&self, prompt: &Prompt) -> Result<Candidate>;
}

/// Strip template tokens and a leading echo of the prompt text
pub fn clean_completion(raw: &str, prompt_text: &str) -> String {
    let mut text = raw.to_string();
    for token in SPECIAL_TOKENS {
        text = text.replace(token, "");
    }

    let mut rest = text.trim_start();
    if let Some(stripped) = rest.strip_prefix("assistant") {
        // Role marker only when it stands alone as a word
        if stripped.is_empty() || stripped.starts_with(char::is_whitespace) {
            rest = stripped.trim_start();
        }
    }
    let prompt_text = prompt_text.trim();
    if !prompt_text.is_empty() {
        if let Some(stripped) = rest.strip_prefix(prompt_text) {
            rest = stripped;
        }
    }

    rest.trim().to_string()
}
