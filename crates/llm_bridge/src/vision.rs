//! Vision model integration for review generation

use crate::ollama::{ChatRequest, OllamaClient};
use anyhow::Result;
use async_trait::async_trait;
use core_pipeline::generation::clean_completion;
use core_pipeline::{Candidate, GenerationClient, GenerationParams, PipelineError, Prompt};

/// Default Ollama vision model
pub const DEFAULT_VISION_MODEL: &str = "qwen2.5vl:3b";

/// Vision model served by Ollama
pub struct VisionModel {
    client: OllamaClient,
    model_name: String,
    params: GenerationParams,
}

impl VisionModel {
    /// Create a new vision model
    pub fn new(client: OllamaClient, model_name: String) -> Self {
        Self {
            client,
            model_name,
            params: GenerationParams::default(),
        }
    }

    /// Create a vision model with default settings (qwen2.5vl:3b)
    pub fn default_model() -> Result<Self> {
        Ok(Self::new(
            OllamaClient::default_client()?,
            DEFAULT_VISION_MODEL.to_string(),
        ))
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Ask the model for one raw completion
    pub async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatRequest::from_prompt(&self.model_name, prompt, self.params);
        tracing::debug!(model = %self.model_name, "Sending prompt to Ollama");

        let response = self.client.chat(&request).await?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl GenerationClient for VisionModel {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &Prompt) -> core_pipeline::Result<Candidate> {
        let raw = self
            .complete(prompt)
            .await
            .map_err(PipelineError::inference)?;
        Ok(Candidate(clean_completion(&raw, &prompt.text())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::OllamaConfig;
    use axum::{routing::post, Json, Router};
    use core_pipeline::{prompt, ImageDataUri};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn model(base_url: String) -> VisionModel {
        let client = OllamaClient::new(OllamaConfig {
            base_url,
            timeout_secs: 5,
        })
        .unwrap();
        VisionModel::new(client, "test-model".to_string())
    }

    fn test_prompt() -> Prompt {
        prompt::build("떡볶이", ImageDataUri::new("image/jpeg", "QUJD"))
    }

    #[test]
    fn test_vision_model_creation() {
        let result = VisionModel::default_model();
        assert!(result.is_ok());
        assert_eq!(result.unwrap().model_name(), DEFAULT_VISION_MODEL);
    }

    #[tokio::test]
    async fn test_generate_returns_cleaned_content() {
        let router = Router::new().route(
            "/api/chat",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["messages"][0]["images"][0], "QUJD");
                Json(json!({
                    "model": "test-model",
                    "message": {"role": "assistant", "content": "  떡볶이 최고예요<|im_end|>\n"},
                    "done": true
                }))
            }),
        );
        let base_url = serve(router).await;

        let candidate = model(base_url).generate(&test_prompt()).await.unwrap();

        assert_eq!(candidate.as_str(), "떡볶이 최고예요");
    }

    #[tokio::test]
    async fn test_generate_maps_http_error_to_inference() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "model requires more system memory",
                )
            }),
        );
        let base_url = serve(router).await;

        let result = model(base_url).generate(&test_prompt()).await;

        match result {
            Err(PipelineError::Inference(msg)) => assert!(msg.contains("system memory")),
            other => panic!("expected inference error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_unreachable_server() {
        let result = model("http://127.0.0.1:9".to_string())
            .generate(&test_prompt())
            .await;
        assert!(matches!(result, Err(PipelineError::Inference(_))));
    }

    // Requires a running Ollama with the default model pulled
    // Run with: cargo test test_generate_live -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_generate_live() {
        let model = VisionModel::default_model().unwrap();
        let result = model.generate(&test_prompt()).await;
        assert!(result.is_ok());
    }
}
