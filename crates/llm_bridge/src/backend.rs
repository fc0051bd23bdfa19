//! Backend selection

use crate::ollama::{OllamaClient, OllamaConfig};
use crate::openai::{OpenAiCompatConfig, OpenAiCompatModel};
use crate::vision::VisionModel;
use anyhow::Result;
use core_pipeline::GenerationClient;
use std::str::FromStr;
use std::sync::Arc;

/// Which model server generates reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Ollama,
    OpenAi,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Backend::Ollama),
            "openai" | "vllm" => Ok(Backend::OpenAi),
            other => anyhow::bail!("Unknown backend '{}' (expected ollama or openai)", other),
        }
    }
}

/// Everything needed to construct a backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub backend: Backend,
    pub ollama: OllamaConfig,
    pub openai: OpenAiCompatConfig,
    /// Ollama model tag; the OpenAI backend uses `openai.model`
    pub ollama_model: String,
}

/// Build the shared generation client
///
/// Called once at startup; the result is shared by every request.
pub fn connect(config: &BackendConfig) -> Result<Arc<dyn GenerationClient>> {
    let client: Arc<dyn GenerationClient> = match config.backend {
        Backend::Ollama => {
            let ollama = OllamaClient::new(config.ollama.clone())?;
            tracing::info!(
                url = %ollama.base_url(),
                model = %config.ollama_model,
                "Using Ollama backend"
            );
            Arc::new(VisionModel::new(ollama, config.ollama_model.clone()))
        }
        Backend::OpenAi => {
            let model = OpenAiCompatModel::new(config.openai.clone())?;
            tracing::info!(
                url = %config.openai.base_url,
                model = %model.model_name(),
                "Using OpenAI-compatible backend"
            );
            Arc::new(model)
        }
    };
    Ok(client)
}
