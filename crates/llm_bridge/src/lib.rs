//! LLM Bridge for vision model backends
//!
//! Implements [`core_pipeline::GenerationClient`] over HTTP model servers:
//! Ollama's chat API and any OpenAI-compatible chat completions API.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod backend;
pub mod ollama;
pub mod openai;
pub mod vision;

pub use backend::{connect, Backend, BackendConfig};
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiCompatConfig, OpenAiCompatModel};
pub use vision::VisionModel;
