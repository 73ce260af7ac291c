//! Ollama Provider
//!
//! Talks to `/api/generate` with streaming disabled. An optional
//! `OLLAMA_API_KEY` is sent as a bearer token for hosted endpoints.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{LlmProvider, LlmResponse, TokenUsage};
use crate::config::LlmConfig;
use crate::types::{DocGateError, ErrorCategory, ErrorClassifier, LlmError, Result};

const PROVIDER_NAME: &str = "ollama";
const API_KEY_ENV: &str = "OLLAMA_API_KEY";

pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    /// Never logged; redacted in debug output
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_base = Self::validate_endpoint(&config.api_base)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DocGateError::config(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        Ok(Self {
            api_base,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.timeout(),
            api_key,
            client,
        })
    }

    /// Validate endpoint URL for security (SSRF prevention)
    ///
    /// Only allows http/https schemes and warns for non-localhost endpoints.
    /// A full `/api/generate` URL is accepted and trimmed to its base.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            DocGateError::config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DocGateError::config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
        {
            debug!(host, "Ollama endpoint is not localhost");
        }

        let mut result = url.to_string();
        while result.ends_with('/') {
            result.pop();
        }
        if let Some(base) = result.strip_suffix("/api/generate") {
            result = base.to_string();
        }
        Ok(result)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> DocGateError {
        if e.is_timeout() {
            DocGateError::timeout("ollama generate", self.timeout)
        } else if e.is_connect() {
            LlmError::from_provider(
                PROVIDER_NAME,
                ErrorCategory::Network,
                format!(
                    "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                    self.api_base
                ),
            )
            .into()
        } else {
            ErrorClassifier::classify(&e.to_string(), PROVIDER_NAME).into()
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        debug!(
            model = %self.model,
            temperature = self.temperature,
            prompt_chars = prompt.len(),
            "Sending request to Ollama"
        );

        let start_time = Instant::now();
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };
        let url = format!("{}/api/generate", self.api_base);

        let response = self
            .request(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Ollama API error ({}): {}", status, body),
                PROVIDER_NAME,
            )
            .into());
        }

        let body: OllamaResponse = response.json().await.map_err(|e| {
            LlmError::from_provider(
                PROVIDER_NAME,
                ErrorCategory::ParseError,
                format!("Failed to decode Ollama response: {}", e),
            )
        })?;

        let content = body
            .response
            .filter(|text| !text.trim().is_empty())
            .or(body.text.filter(|text| !text.trim().is_empty()))
            .ok_or_else(|| {
                LlmError::from_provider(
                    PROVIDER_NAME,
                    ErrorCategory::ParseError,
                    "Empty response from Ollama",
                )
            })?;

        let elapsed = start_time.elapsed();
        let usage = TokenUsage {
            prompt_tokens: body.prompt_eval_count.unwrap_or(0),
            completion_tokens: body.eval_count.unwrap_or(0),
        };
        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            server_ms = body.total_duration.map(|ns| ns / 1_000_000),
            completion_tokens = usage.completion_tokens,
            "Received response from Ollama"
        );

        Ok(LlmResponse {
            content: content.trim().to_string(),
            usage,
            elapsed,
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);

        match self.request(self.client.get(&url)).send().await {
            Ok(resp) if resp.status().is_success() => {
                let Ok(tags) = resp.json::<OllamaTagsResponse>().await else {
                    info!("Ollama is available");
                    return Ok(true);
                };
                let bare_model = self.model.trim_end_matches(":latest");
                let model_available = tags
                    .models
                    .iter()
                    .any(|m| m.name == self.model || m.name.starts_with(bare_model));

                if model_available {
                    info!(model = %self.model, "Ollama is available");
                    Ok(true)
                } else {
                    warn!(
                        "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                        self.model, self.model
                    );
                    Ok(false)
                }
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Ollama API check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Ollama not available. Start with: ollama serve");
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: Option<String>,
    /// Some gateways answer with `text` instead of `response`
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    /// Nanoseconds
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_base: &str) -> LlmConfig {
        LlmConfig {
            api_base: api_base.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let provider = OllamaProvider::new(&LlmConfig::default()).unwrap();
        assert_eq!(provider.api_base, "http://localhost:11434");
        assert_eq!(provider.model, LlmConfig::default().model);
    }

    #[test]
    fn test_generate_url_is_trimmed() {
        let provider = OllamaProvider::new(&config("https://ollama.com/api/generate")).unwrap();
        assert_eq!(provider.api_base, "https://ollama.com");
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(OllamaProvider::new(&config("ftp://localhost:11434")).is_err());
        assert!(OllamaProvider::new(&config("not a url")).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut provider = OllamaProvider::new(&LlmConfig::default()).unwrap();
        provider.api_key = Some(SecretString::from("sk-secret".to_string()));
        let debug = format!("{:?}", provider);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_response_fallback_field() {
        let body: OllamaResponse =
            serde_json::from_str(r#"{"text": "hello", "eval_count": 3}"#).unwrap();
        assert_eq!(body.response, None);
        assert_eq!(body.text.as_deref(), Some("hello"));
        assert_eq!(body.eval_count, Some(3));
    }
}
