//! Local embedding provider using the `fastembed` crate.
//!
//! This module is only available when the `fastembed` feature is enabled.
//! The default model is `sentence-transformers/all-MiniLM-L6-v2`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// An [`EmbeddingProvider`] running an ONNX sentence-transformer locally.
///
/// The model is downloaded on first use and cached by `fastembed`. Inference
/// runs on the blocking thread pool.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    dimensions: usize,
}

impl FastEmbedProvider {
    /// Dimensionality of `all-MiniLM-L6-v2`.
    const MINILM_DIMENSIONS: usize = 384;

    /// Load `all-MiniLM-L6-v2`.
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| RagError::Embedding {
                provider: "fastembed".into(),
                message: format!("failed to initialize embedding model: {e}"),
            })?;
        Ok(Self { model: Arc::new(Mutex::new(model)), dimensions: Self::MINILM_DIMENSIONS })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::Embedding {
            provider: "fastembed".into(),
            message: "model returned no embedding".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "fastembed", batch_size = texts.len(), "embedding batch");

        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let model = Arc::clone(&self.model);
        let result = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().map_err(|_| "embedding model lock poisoned".to_string())?;
            model.embed(owned, None).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|inner| inner);

        result.map_err(|message| {
            error!(provider = "fastembed", error = %message, "embedding failed");
            RagError::Embedding { provider: "fastembed".into(), message }
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
