//! Remote embeddings from any OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
/// Width of `text-embedding-3-small` vectors.
const DEFAULT_DIMENSIONS: usize = 1536;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Embeds text by POSTing to `{base_url}/embeddings`.
///
/// ```rust,ignore
/// let provider = OpenAIEmbeddingProvider::new(api_key)?
///     .with_model("text-embedding-3-large")
///     .with_dimensions(1024);
/// ```
pub struct OpenAIEmbeddingProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// Sent as `dimensions` so the server shortens vectors; unset means the
    /// model's native width.
    requested_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::embedding(PROVIDER, "API key is empty"));
        }
        Ok(Self {
            http: http_client(DEFAULT_TIMEOUT)?,
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            requested_dimensions: None,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use another compatible server, e.g. a local gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = http_client(timeout)?;
        Ok(self)
    }

    /// Ask the server for `dims`-wide vectors.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.requested_dimensions = Some(dims);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::embedding(PROVIDER, format!("cannot build HTTP client: {e}")))
}

// ── wire format ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// The `error.message` of an OpenAI-style error body, else the body itself.
pub(crate) fn error_detail(body: String) -> String {
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body,
    }
}

/// Vectors in input order, checking that each input got one of the
/// expected width.
fn vectors_in_order(
    response: EmbeddingsResponse,
    inputs: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut items = response.data;
    if items.len() != inputs {
        return Err(RagError::embedding(
            PROVIDER,
            format!("sent {inputs} inputs, got {} embeddings back", items.len()),
        ));
    }
    items.sort_by_key(|item| item.index);
    if let Some(bad) = items.iter().find(|item| item.embedding.len() != dimensions) {
        return Err(RagError::embedding(
            PROVIDER,
            format!("expected {dimensions}-dimensional vectors, got {}", bad.embedding.len()),
        ));
    }
    Ok(items.into_iter().map(|item| item.embedding).collect())
}

// ── provider ────────────────────────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| RagError::embedding(PROVIDER, "no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, inputs = texts.len(), "requesting embeddings");

        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions,
        };
        let sent = self.http.post(self.endpoint()).bearer_auth(&self.api_key).json(&request).send();
        let response = sent.await.map_err(|e| {
            error!(model = %self.model, error = %e, "embeddings request failed");
            let kind = if e.is_timeout() { "request timed out" } else { "request failed" };
            RagError::embedding(PROVIDER, format!("{kind}: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(model = %self.model, %status, %detail, "embeddings API error");
            return Err(RagError::embedding(PROVIDER, format!("{status}: {detail}")));
        }

        let body: EmbeddingsResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "unreadable embeddings response");
            RagError::embedding(PROVIDER, format!("unreadable response: {e}"))
        })?;
        vectors_in_order(body, texts.len(), self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(value: serde_json::Value) -> EmbeddingsResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(OpenAIEmbeddingProvider::new(" "), Err(RagError::Embedding { .. })));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let provider = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn dimensions_are_sent_only_when_requested() {
        let inputs = ["a"];
        let plain = EmbeddingsRequest { model: "m", input: &inputs, dimensions: None };
        assert_eq!(serde_json::to_value(&plain).unwrap(), json!({"model": "m", "input": ["a"]}));

        let provider = OpenAIEmbeddingProvider::new("sk").unwrap().with_dimensions(256);
        assert_eq!(provider.dimensions(), 256);
        assert_eq!(provider.requested_dimensions, Some(256));
    }

    #[test]
    fn out_of_order_items_are_sorted() {
        let body = response(json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ],
            "model": "text-embedding-3-small"
        }));
        assert_eq!(vectors_in_order(body, 2, 2).unwrap(), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn missing_or_misshapen_vectors_are_errors() {
        let one = json!({"data": [{"index": 0, "embedding": [1.0]}]});
        assert!(vectors_in_order(response(one.clone()), 2, 1).is_err());
        assert!(vectors_in_order(response(one), 1, 3).is_err());
    }

    #[test]
    fn error_detail_prefers_message_field() {
        let body = json!({"error": {"message": "Invalid API Key", "type": "invalid_request_error"}});
        assert_eq!(error_detail(body.to_string()), "Invalid API Key");
        assert_eq!(error_detail("gateway timeout".to_string()), "gateway timeout");
    }
}
