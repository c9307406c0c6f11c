use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::AppError;

const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Text generation backend used by the translation pipeline
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for `prompt`, giving up after `timeout`
    async fn generate(&self, prompt: &str, model: &str, timeout: Duration)
        -> Result<String, AppError>;

    /// Whether the backend currently answers requests
    async fn is_available(&self) -> bool;
}

/// Client for an Ollama-compatible `/api/generate` endpoint
pub struct OllamaClient {
    base_url: String,
    api_key: Option<String>,
    http_client: HttpClient,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            http_client: HttpClient::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pull the completion text out of a generate response body
    fn extract_text(body: &Value) -> Option<&str> {
        ["response", "text", "content"]
            .iter()
            .find_map(|field| body.get(*field).and_then(Value::as_str))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<String, AppError> {
        let mut request = self
            .http_client
            .post(self.endpoint("/api/generate"))
            .timeout(timeout)
            .json(&json!({
                "model": model,
                "prompt": prompt,
                "stream": false,
            }));

        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::TranslationTimeout
            } else {
                AppError::TranslationUnavailable(format!("Failed to call LLM service: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::TranslationUnavailable(format!(
                "LLM service returned error {}: {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AppError::TranslationTimeout
            } else {
                AppError::invalid_translation_response(&format!(
                    "Failed to parse LLM response: {}",
                    e
                ))
            }
        })?;

        Self::extract_text(&body)
            .map(str::to_string)
            .ok_or_else(|| AppError::invalid_translation_response(&body.to_string()))
    }

    async fn is_available(&self) -> bool {
        let response = self
            .http_client
            .get(self.endpoint("/api/tags"))
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("LLM availability check failed: {}", e);
                false
            }
        }
    }
}
