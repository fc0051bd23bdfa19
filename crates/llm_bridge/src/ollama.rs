//! Ollama HTTP API client

use anyhow::{Context, Result};
use core_pipeline::{ContentPart, GenerationParams, Prompt};
use serde::{Deserialize, Serialize};

/// Configuration for Ollama client
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for Ollama API (default: http://localhost:11434)
    pub base_url: String,
    /// Timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Ollama API client
pub struct OllamaClient {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Create a client with default configuration
    pub fn default_client() -> Result<Self> {
        Self::new(OllamaConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Send a non-streaming chat request to Ollama
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({}): {}", status, error_text);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;
        Ok(chat_response)
    }
}

/// Chat request to Ollama
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
}

impl ChatRequest {
    /// Convert a pipeline prompt into a non-streaming Ollama request
    ///
    /// Ollama takes images per message as bare base64, so the data URI
    /// header is dropped.
    pub fn from_prompt(model: &str, prompt: &Prompt, params: GenerationParams) -> Self {
        let messages = prompt
            .messages
            .iter()
            .map(|message| {
                let mut texts = Vec::new();
                let mut images = Vec::new();
                for part in &message.content {
                    match part {
                        ContentPart::Image { image } => {
                            images.push(image.base64_payload().to_string())
                        }
                        ContentPart::Text { text } => texts.push(text.as_str()),
                    }
                }
                ChatMessage {
                    role: message.role.clone(),
                    content: texts.join("\n"),
                    images: (!images.is_empty()).then_some(images),
                }
            })
            .collect();

        Self {
            model: model.to_string(),
            messages,
            stream: Some(false),
            options: Some(ChatOptions {
                temperature: Some(params.temperature),
                num_predict: Some(params.max_new_tokens),
            }),
        }
    }
}

/// Sampling options
#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Base64-encoded images attached to this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Chat response from Ollama
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub message: ChatMessage,
    pub done: bool,
}
