//! OpenAI-compatible chat completions backend
//!
//! Works with any server exposing `/v1/chat/completions` with image inputs,
//! e.g. vLLM serving Qwen2-VL. Images are sent as data URIs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use core_pipeline::generation::clean_completion;
use core_pipeline::{
    Candidate, ContentPart, GenerationClient, GenerationParams, PipelineError, Prompt,
};
use serde_json::{json, Value};

/// Configuration for an OpenAI-compatible server
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Base URL including the version prefix (default: http://localhost:8000/v1)
    pub base_url: String,
    /// Bearer token; local servers usually need none
    pub api_key: Option<String>,
    /// Model to use (default: Qwen/Qwen2-VL-2B-Instruct)
    pub model: String,
    /// Timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: None,
            model: "Qwen/Qwen2-VL-2B-Instruct".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Vision model behind an OpenAI-compatible API
pub struct OpenAiCompatModel {
    config: OpenAiCompatConfig,
    client: reqwest::Client,
    params: GenerationParams,
}

impl OpenAiCompatModel {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            client,
            params: GenerationParams::default(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Ask the model for one raw completion
    pub async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = request_body(&self.config.model, prompt, self.params);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .context("OpenAI-compatible request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read response")?;

        if !status.is_success() {
            anyhow::bail!("OpenAI-compatible API error ({}): {}", status, text);
        }

        let json: Value = serde_json::from_str(&text).context("Failed to parse response JSON")?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .context("No content in response")?;

        Ok(content.to_string())
    }
}

/// Chat completions body with image parts as `image_url` data URIs
fn request_body(model: &str, prompt: &Prompt, params: GenerationParams) -> Value {
    let messages: Vec<Value> = prompt
        .messages
        .iter()
        .map(|message| {
            let content: Vec<Value> = message
                .content
                .iter()
                .map(|part| match part {
                    ContentPart::Image { image } => json!({
                        "type": "image_url",
                        "image_url": { "url": image.as_str() }
                    }),
                    ContentPart::Text { text } => json!({
                        "type": "text",
                        "text": text
                    }),
                })
                .collect();
            json!({ "role": message.role, "content": content })
        })
        .collect();

    json!({
        "model": model,
        "messages": messages,
        "max_tokens": params.max_new_tokens,
        "temperature": params.temperature,
    })
}

#[async_trait]
impl GenerationClient for OpenAiCompatModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &Prompt) -> core_pipeline::Result<Candidate> {
        let raw = self
            .complete(prompt)
            .await
            .map_err(PipelineError::inference)?;
        Ok(Candidate(clean_completion(&raw, &prompt.text())))
    }
}
