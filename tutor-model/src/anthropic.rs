//! Anthropic Messages API backend.
//!
//! Differences from OpenAI-compatible APIs that shape this client:
//! auth is an `x-api-key` header, the `anthropic-version` header is
//! required, and the system instruction is a top-level `system` field
//! rather than a message in the array.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, error};

use tutor_core::{GenerationBackend, GenerationRequest, GenerationResponse, Result, TutorError};

use crate::parse;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Configuration for [`AnthropicBackend`].
///
/// The per-call timeout bounds the whole generation round trip; it is the
/// dominant term in the pipeline's latency target, so the default stays
/// under the 3-second end-to-end goal.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for the `x-api-key` header.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// API base URL (override for proxies and tests).
    pub base_url: String,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Create a config with the given key and the default model, base URL,
    /// and a 2.5s timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(2500),
        }
    }

    /// Create a config from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            TutorError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A [`GenerationBackend`] speaking the Anthropic Messages API.
///
/// One attempt per [`generate`](GenerationBackend::generate) call; retry
/// orchestration lives with the caller (the answerer wraps calls in
/// [`tutor_core::with_retry`]). Transient failures (timeouts, 429, 5xx)
/// come back as [`TutorError::Generation`] so the retry helper can act;
/// everything permanent short-circuits.
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    /// Create a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TutorError::Config`] if the API key is empty or the HTTP
    /// client cannot be constructed.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(TutorError::Config("Anthropic API key must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TutorError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn build_body(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.config.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": [
                { "role": "user", "content": request.user }
            ],
        })
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let url = format!("{}/messages", self.config.base_url);
        let body = self.build_body(&request);

        debug!(model = %self.config.model, max_tokens = request.max_tokens, "generation call");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                // Covers connect failures and the per-call timeout.
                error!(error = %e, "generation request failed");
                TutorError::Generation {
                    provider: "anthropic".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let detail = parse::error_detail(&raw);
            error!(%status, detail = %detail, "generation API error");

            // 429 and server errors are transient; everything else
            // (bad request, bad credentials) will not improve on retry.
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(TutorError::Generation {
                    provider: "anthropic".into(),
                    message: format!("API returned {status}: {detail}"),
                });
            }
            return Err(TutorError::GenerationRejected {
                provider: "anthropic".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let raw = response.text().await.map_err(|e| TutorError::Generation {
            provider: "anthropic".into(),
            message: format!("failed to read response body: {e}"),
        })?;

        parse::parse_messages_response(&raw)
    }
}
