//! Ollama generation client
//!
//! Non-streaming completion calls against a local Ollama server:
//! `POST /api/generate` with `stream: false`, one response per prompt.
//! The two failure modes worth telling apart for a local process are
//! connection refused (server not running) and timeout; both map to
//! dedicated error variants and are never retried here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Generator;
use crate::errors::{RagError, Result};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Default request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// HTTP client for Ollama completions
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaGenerator {
    /// Create a client with default endpoint and model
    pub fn new() -> Result<Self> {
        Self::with_config(&GenerationConfig::default())
    }

    pub fn with_config(config: &GenerationConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout,
        })
    }

    /// Check if the Ollama server is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, err: reqwest::Error) -> RagError {
        if err.is_timeout() {
            return RagError::GenerationTimeout {
                duration_ms: self.timeout.as_millis() as u64,
            };
        }
        if err.is_connect() {
            return RagError::GenerationUnreachable(self.base_url.clone());
        }
        RagError::Http(err)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::OllamaApi(format!("HTTP {}: {}", status, error_text)));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| self.classify(e))?;
        Ok(body.response)
    }
}

/// Ollama generate request body
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Ollama generate response body (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
