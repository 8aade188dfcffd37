//! Chunking and retrieval settings.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How pages are cut into chunks and how many chunks a question retrieves.
///
/// Defaults: 1000-character chunks overlapping by 200, four chunks per
/// question, no score cut-off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Upper bound on chunk length, in characters.
    pub chunk_size: usize,
    /// Characters repeated at the start of the next chunk.
    pub chunk_overlap: usize,
    /// Chunks handed to the model per question.
    pub top_k: usize,
    /// Drop retrieved chunks scoring below this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, top_k: 4, similarity_threshold: None }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the settings describe a usable window and retrieval size.
    ///
    /// Deserialized configs skip the builder, so call this before using one.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::config("chunk_size must be at least 1"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::config(format!(
                "chunk_overlap {} leaves no room to advance a {}-character window",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::config("top_k must be at least 1"));
        }
        if self.similarity_threshold.is_some_and(f32::is_nan) {
            return Err(RagError::config("similarity_threshold must be a number"));
        }
        Ok(())
    }
}

/// Builds a [`RagConfig`] starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Finish, rejecting settings that [`RagConfig::validate`] refuses.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_1000_200_top_4() {
        let config = RagConfig::default();
        assert_eq!((config.chunk_size, config.chunk_overlap, config.top_k), (1000, 200, 4));
        assert_eq!(config.similarity_threshold, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::Config(msg) if msg.contains("chunk_overlap 100")));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
    }

    #[test]
    fn nan_threshold_is_rejected() {
        assert!(RagConfig::builder().similarity_threshold(f32::NAN).build().is_err());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: RagConfig = serde_json::from_str(r#"{"top_k": 8}"#).unwrap();
        assert_eq!(config.top_k, 8);
        assert_eq!(config.chunk_size, 1000);
        assert!(config.validate().is_ok());
    }
}
