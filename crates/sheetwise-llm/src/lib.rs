//! Sheetwise LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `sheetwise-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `ChatCompletionProvider`: OpenAI-compatible chat completions (Groq by default)
//!
//! # Examples
//!
//! ```
//! use sheetwise_llm::MockProvider;
//! use sheetwise_domain::LlmProvider;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new(r#"{"Gender": "Female"}"#);
//! let result = provider.complete("test prompt").await.unwrap();
//! assert_eq!(result, r#"{"Gender": "Female"}"#);
//! # });
//! ```

#![warn(missing_docs)]

pub mod chat;

use async_trait::async_trait;
use sheetwise_domain::LlmProvider;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use chat::ChatCompletionProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// API key rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Request did not finish in time
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// What the mock does when a prompt matches
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(LlmError),
    Delayed(Duration, String),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockReply>,
    keyed: Vec<(String, MockReply)>,
    prompts: Vec<String>,
}

/// Mock LLM provider for deterministic testing
///
/// Resolution order for each call:
/// 1. the next scripted reply, if any were queued with `push_*`;
/// 2. the first keyed reply whose pattern occurs in the prompt;
/// 3. the default response.
///
/// Clones share state, so a test can keep a handle after moving the
/// provider into an extractor.
///
/// # Examples
///
/// ```
/// use sheetwise_llm::{LlmError, MockProvider};
/// use sheetwise_domain::LlmProvider;
///
/// # tokio_test::block_on(async {
/// let provider = MockProvider::new("fallback");
/// provider.add_response("Colour", r#"{"Colour": "black"}"#);
/// provider.push_error(LlmError::Timeout(30));
///
/// assert!(provider.complete("Colour?").await.is_err());
/// assert_eq!(provider.complete("Colour?").await.unwrap(), r#"{"Colour": "black"}"#);
/// assert_eq!(provider.complete("Gender?").await.unwrap(), "fallback");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model: "mock".to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Override the reported model name
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the recorded prompts
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Respond with `response` whenever `pattern` occurs in the prompt
    pub fn add_response(&self, pattern: impl Into<String>, response: impl Into<String>) {
        self.state()
            .keyed
            .push((pattern.into(), MockReply::Text(response.into())));
    }

    /// Fail with `error` whenever `pattern` occurs in the prompt
    pub fn add_error(&self, pattern: impl Into<String>, error: LlmError) {
        self.state().keyed.push((pattern.into(), MockReply::Error(error)));
    }

    /// Sleep for `delay` before answering whenever `pattern` occurs in the prompt
    pub fn add_delayed_response(
        &self,
        pattern: impl Into<String>,
        delay: Duration,
        response: impl Into<String>,
    ) {
        self.state()
            .keyed
            .push((pattern.into(), MockReply::Delayed(delay, response.into())));
    }

    /// Queue a response for the next unscripted call
    pub fn push_response(&self, response: impl Into<String>) {
        self.state().script.push_back(MockReply::Text(response.into()));
    }

    /// Queue an error for the next unscripted call
    pub fn push_error(&self, error: LlmError) {
        self.state().script.push_back(MockReply::Error(error));
    }

    /// Queue a slow response for the next unscripted call
    pub fn push_delayed_response(&self, delay: Duration, response: impl Into<String>) {
        self.state()
            .script
            .push_back(MockReply::Delayed(delay, response.into()));
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> usize {
        self.state().prompts.len()
    }

    /// Every prompt received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    /// Forget recorded prompts
    pub fn reset_call_count(&self) {
        self.state().prompts.clear();
    }

    fn resolve(&self, prompt: &str) -> MockReply {
        let mut state = self.state();
        state.prompts.push(prompt.to_string());

        if let Some(reply) = state.script.pop_front() {
            return reply;
        }

        state
            .keyed
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| MockReply::Text(self.default_response.clone()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn complete(&self, prompt: &str) -> Result<String, Self::Error> {
        match self.resolve(prompt) {
            MockReply::Text(text) => Ok(text),
            MockReply::Error(error) => Err(error),
            MockReply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.complete("any prompt").await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_keyed_responses() {
        let provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.complete("say hello").await.unwrap(), "world");
        assert_eq!(provider.complete("foo fighters").await.unwrap(), "bar");
        assert_eq!(
            provider.complete("unknown").await.unwrap(),
            "Default mock response"
        );
    }

    #[tokio::test]
    async fn test_mock_provider_first_matching_pattern_wins() {
        let provider = MockProvider::default();
        provider.add_response("Seal", "first");
        provider.add_response("Housing Seal", "second");

        assert_eq!(provider.complete("Housing Seal").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_mock_provider_script_takes_precedence() {
        let provider = MockProvider::new("default");
        provider.add_response("prompt", "keyed");
        provider.push_response("scripted");

        assert_eq!(provider.complete("prompt").await.unwrap(), "scripted");
        assert_eq!(provider.complete("prompt").await.unwrap(), "keyed");
    }

    #[tokio::test]
    async fn test_mock_provider_call_count_and_prompts() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.complete("prompt1").await.unwrap();
        provider.complete("prompt2").await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1", "prompt2"]);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let provider = MockProvider::default();
        provider.add_error("bad prompt", LlmError::RateLimitExceeded("slow down".into()));

        let result = provider.complete("bad prompt").await;
        assert!(matches!(result, Err(LlmError::RateLimitExceeded(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_provider_delay() {
        let provider = MockProvider::default();
        provider.push_delayed_response(Duration::from_secs(5), "late");

        let started = tokio::time::Instant::now();
        assert_eq!(provider.complete("x").await.unwrap(), "late");
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.complete("test").await.unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[test]
    fn test_rate_limit_message_mentions_rate_limit() {
        let message = LlmError::RateLimitExceeded("429 Too Many Requests".into()).to_string();
        assert!(message.to_lowercase().contains("rate limit"));
    }
}
