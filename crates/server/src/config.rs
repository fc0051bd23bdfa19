//! Server configuration from environment variables

use anyhow::{Context, Result};
use core_pipeline::{ServiceConfig, ValidationPolicy, DEFAULT_MAX_ATTEMPTS};
use llm_bridge::vision::DEFAULT_VISION_MODEL;
use llm_bridge::{Backend, BackendConfig, OllamaConfig, OpenAiCompatConfig};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Review pipelines allowed to run at once; the rest wait their turn
    pub max_concurrent_reviews: usize,
    pub service: ServiceConfig,
    pub backend: BackendConfig,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, applying defaults for unset keys
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = var("REVIEW_BACKEND")
            .map(|v| Backend::from_str(&v))
            .transpose()?
            .unwrap_or(Backend::Ollama);

        let mut ollama = OllamaConfig::default();
        if let Some(url) = var("OLLAMA_URL") {
            ollama.base_url = url;
        }

        let mut openai = OpenAiCompatConfig::default();
        if let Some(url) = var("OPENAI_BASE_URL") {
            openai.base_url = url;
        }
        openai.api_key = var("OPENAI_API_KEY");

        let model = var("REVIEW_MODEL");
        if let Some(model) = &model {
            openai.model = model.clone();
        }

        let max_concurrent_reviews = parse_or(&var, "MAX_CONCURRENT_REVIEWS", 1usize)?;
        if max_concurrent_reviews == 0 {
            anyhow::bail!("MAX_CONCURRENT_REVIEWS must be at least 1");
        }

        let validation = if parse_or(&var, "STRICT_VALIDATION", false)? {
            ValidationPolicy::Strict
        } else {
            ValidationPolicy::Lenient
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "PORT", 8000u16)?,
            max_concurrent_reviews,
            service: ServiceConfig {
                max_attempts: parse_or(&var, "MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
                validation,
            },
            backend: BackendConfig {
                backend,
                ollama,
                openai,
                ollama_model: model.unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.max_concurrent_reviews, 1);
        assert_eq!(config.service.max_attempts, 5);
        assert_eq!(config.service.validation, ValidationPolicy::Lenient);
        assert_eq!(config.backend.backend, Backend::Ollama);
        assert_eq!(config.backend.ollama_model, DEFAULT_VISION_MODEL);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "5000"),
            ("REVIEW_BACKEND", "openai"),
            ("OPENAI_BASE_URL", "http://gpu-box:8000/v1"),
            ("REVIEW_MODEL", "Qwen/Qwen2-VL-7B-Instruct"),
            ("MAX_CONCURRENT_REVIEWS", "4"),
            ("STRICT_VALIDATION", "true"),
            ("MAX_ATTEMPTS", "2"),
        ])
        .unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.backend.backend, Backend::OpenAi);
        assert_eq!(config.backend.openai.base_url, "http://gpu-box:8000/v1");
        assert_eq!(config.backend.openai.model, "Qwen/Qwen2-VL-7B-Instruct");
        assert_eq!(config.max_concurrent_reviews, 4);
        assert_eq!(config.service.validation, ValidationPolicy::Strict);
        assert_eq!(config.service.max_attempts, 2);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("PORT", "  "), ("OPENAI_API_KEY", "")]).unwrap();
        assert_eq!(config.port, 8000);
        assert!(config.backend.openai.api_key.is_none());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(load(&[("MAX_CONCURRENT_REVIEWS", "0")]).is_err());
        assert!(load(&[("REVIEW_BACKEND", "mystery")]).is_err());
    }
}
