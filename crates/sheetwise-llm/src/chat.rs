//! OpenAI-compatible chat completion provider
//!
//! Talks to any endpoint implementing `POST {endpoint}/chat/completions`.
//! Defaults target Groq's hosted API.
//!
//! # Features
//!
//! - Async HTTP communication with bearer authentication
//! - Retry with exponential backoff on transport failures and 5xx responses
//! - Rate limit (429) and authentication (401/403) responses surface
//!   immediately so the caller can classify them
//!
//! # Examples
//!
//! ```no_run
//! use sheetwise_llm::ChatCompletionProvider;
//!
//! let provider = ChatCompletionProvider::groq("gsk_...", "mixtral-8x7b-32768")
//!     .unwrap()
//!     .with_temperature(0.1)
//!     .with_max_tokens(1024);
//! ```

use crate::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sheetwise_domain::LlmProvider;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Groq OpenAI-compatible endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1";

/// Default model name
pub const DEFAULT_MODEL: &str = "mixtral-8x7b-32768";

/// Default timeout for LLM requests (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts per completion
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Longest wait between two attempts
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Default completion length cap
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Backoff before the attempt following attempt number `attempt` (1-based)
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Chat completion client for OpenAI-compatible APIs
#[derive(Debug, Clone)]
pub struct ChatCompletionProvider {
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    max_retries: u32,
    retry_base_delay: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Prefer the API's `error.message` over the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

impl ChatCompletionProvider {
    /// Create a provider for an arbitrary OpenAI-compatible endpoint
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Authentication` for an empty API key and
    /// `LlmError::Other` if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Authentication("API key is empty".to_string()));
        }

        let client = Self::build_client(DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_secs(1),
            client,
        })
    }

    /// Create a provider for Groq's hosted API
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model, api_key)
    }

    fn build_client(timeout_secs: u64) -> Result<reqwest::Client, LlmError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion length cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the per-request HTTP timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self, LlmError> {
        self.client = Self::build_client(timeout_secs)?;
        self.timeout_secs = timeout_secs;
        Ok(self)
    }

    /// Spread a total time budget over every attempt and backoff
    ///
    /// Call after `with_max_retries` and `with_retry_base_delay`. Each
    /// attempt gets at least one second.
    pub fn with_total_timeout(self, total_secs: u64) -> Result<Self, LlmError> {
        let per_attempt = self.attempt_timeout_secs(total_secs);
        self.with_timeout(per_attempt)
    }

    fn attempt_timeout_secs(&self, total_secs: u64) -> u64 {
        let attempts = self.max_retries.max(1);
        let backoff = (1..attempts).fold(Duration::ZERO, |sum, attempt| {
            sum.saturating_add(retry_delay(self.retry_base_delay, attempt))
        });
        let budget = Duration::from_secs(total_secs).saturating_sub(backoff);
        (budget.as_secs() / u64::from(attempts)).max(1)
    }

    /// Set the maximum number of attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the first backoff delay; later delays double
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Endpoint base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one prompt as a single user message
    ///
    /// # Errors
    ///
    /// - `RateLimitExceeded` on HTTP 429 (not retried)
    /// - `Authentication` on HTTP 401/403
    /// - `ModelNotAvailable` on HTTP 404
    /// - `Timeout` or `Communication` once retries are exhausted
    /// - `InvalidResponse` when the body has no completion text
    pub async fn chat(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.endpoint);

        let request_body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response.json::<ChatResponse>().await.map_err(|e| {
                            LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                        })?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.message.content)
                            .ok_or_else(|| {
                                LlmError::InvalidResponse("Response has no choices".to_string())
                            });
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    let message = error_message(&body);

                    match status {
                        reqwest::StatusCode::TOO_MANY_REQUESTS => {
                            return Err(LlmError::RateLimitExceeded(message));
                        }
                        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                            return Err(LlmError::Authentication(message));
                        }
                        reqwest::StatusCode::NOT_FOUND => {
                            return Err(LlmError::ModelNotAvailable(self.model.clone()));
                        }
                        _ if status.is_client_error() => {
                            return Err(LlmError::Communication(format!(
                                "HTTP {}: {}",
                                status, message
                            )));
                        }
                        _ => {
                            warn!("Completion attempt {} failed with HTTP {}", attempts + 1, status);
                            last_error =
                                Some(LlmError::Communication(format!("HTTP {}: {}", status, message)));
                        }
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!("Completion attempt {} timed out", attempts + 1);
                    last_error = Some(LlmError::Timeout(self.timeout_secs));
                }
                Err(e) => {
                    warn!("Completion attempt {} failed: {}", attempts + 1, e);
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                let delay = retry_delay(self.retry_base_delay, attempts);
                debug!("Retrying completion in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionProvider {
    type Error = LlmError;

    async fn complete(&self, prompt: &str) -> Result<String, Self::Error> {
        self.chat(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
