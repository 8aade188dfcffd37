//! Chat model client.
//!
//! [`Generator`] is the seam between prompt assembly and the hosted model.
//! [`ChatCompletionsClient`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint; by default Groq's.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::llm::{ChatCompletionsClient, LlmConfig};
//!
//! let client = ChatCompletionsClient::new(LlmConfig::groq(std::env::var("GROQ_API_KEY")?))?;
//! let answer = client.generate(&messages).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::openai::error_detail;
use crate::prompt::{ChatMessage, Role};

/// Groq's OpenAI-compatible API base URL.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// The default chat model.
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// The default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces a completion for a chat prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate the assistant's reply to `messages`.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Connection and sampling settings for [`ChatCompletionsClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub api_key: String,
    /// API base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    /// Sampling temperature; the provider default when `None`.
    pub temperature: Option<f32>,
    /// Upper bound on a single request, connect to last byte.
    pub timeout: Duration,
}

impl LlmConfig {
    /// Groq settings with the default model and timeout.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GROQ_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A [`Generator`] for OpenAI-compatible chat completions APIs.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    config: LlmConfig,
    endpoint: String,
}

impl ChatCompletionsClient {
    const PROVIDER: &'static str = "chat-completions";

    /// Create a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the API key or model is empty, or
    /// the HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RagError::Config("LLM API key must not be empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(RagError::Config("LLM model must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self { client, config, endpoint })
    }

    /// The model requests are sent to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn error(message: impl Into<String>) -> RagError {
        RagError::Generation { provider: Self::PROVIDER.to_string(), message: message.into() }
    }
}

// ── Chat completions request/response types ─────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    content: Option<String>,
}

/// Pull the assistant text out of a chat completions response body.
fn answer_text(response: ChatResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatCompletionsClient::error("response contained no choices"))?;

    if let Some(role) = choice.message.role {
        if role != Role::Assistant {
            return Err(ChatCompletionsClient::error(format!(
                "unexpected message role in response: {role:?}"
            )));
        }
    }

    choice
        .message
        .content
        .ok_or_else(|| ChatCompletionsClient::error("response message has no content"))
}

#[async_trait]
impl Generator for ChatCompletionsClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(model = %self.config.model, messages = messages.len(), "sending chat completion");

        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.config.model, error = %e, "chat request failed");
                let kind = if e.is_timeout() { "request timed out" } else { "request failed" };
                Self::error(format!("{kind}: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(model = %self.config.model, %status, "chat API error");
            return Err(Self::error(format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %self.config.model, error = %e, "failed to parse chat response");
            Self::error(format!("failed to parse response: {e}"))
        })?;

        answer_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn groq_defaults() {
        let config = LlmConfig::groq("gsk_test");
        assert_eq!(config.base_url, GROQ_API_BASE);
        assert_eq!(config.model, "openai/gpt-oss-120b");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.temperature, None);
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client =
            ChatCompletionsClient::new(LlmConfig::groq("k").with_base_url("http://localhost:1234/v1/")).unwrap();
        assert_eq!(client.endpoint, "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(ChatCompletionsClient::new(LlmConfig::groq("  ")), Err(RagError::Config(_))));
    }

    #[test]
    fn request_body_shape() {
        let messages = vec![ChatMessage::system("ctx"), ChatMessage::user("q")];
        let body = ChatRequest { model: "m", messages: &messages, temperature: Some(0.5) };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "m",
                "messages": [
                    {"role": "system", "content": "ctx"},
                    {"role": "user", "content": "q"}
                ],
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn parses_first_choice_content() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "openai/gpt-oss-120b",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Revenue was $5M."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }))
        .unwrap();
        assert_eq!(answer_text(response).unwrap(), "Revenue was $5M.");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(answer_text(response), Err(RagError::Generation { .. })));
    }

    #[test]
    fn null_content_is_an_error() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(answer_text(response).is_err());
    }
}
