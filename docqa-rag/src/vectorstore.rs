use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// Where embedded chunks live between indexing and retrieval.
///
/// A store holds named collections, each fixed to one embedding width.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Make `name` available for upserts. Idempotent for the same width.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Add embedded chunks, replacing any stored chunk with the same id.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// The `top_k` chunks closest to `embedding`, best first.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of chunks in `collection`.
    async fn count(&self, collection: &str) -> Result<usize>;
}
