//! Indexing and retrieval.
//!
//! [`RagPipeline`] owns the path from page text to searchable vectors and
//! back: documents are chunked, embedded in batches and upserted into a
//! [`VectorStore`]; questions are embedded the same way and searched. It is
//! the [`Retriever`] a [`RetrievalChain`](crate::RetrievalChain) asks.
//!
//! ```rust,ignore
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(FixedSizeChunker::new(1000, 200)))
//!     .build()?;
//!
//! pipeline.create_collection().await?;
//! let stats = pipeline.ingest_batch(&report.documents).await?;
//! let hits = pipeline.query("What was net revenue?").await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

pub const DEFAULT_COLLECTION: &str = "documents";

/// Chunks sent to the embedding provider in one call.
pub const EMBED_BATCH_SIZE: usize = 64;

/// Returns the chunks most relevant to a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Relevant chunks for `query`, most relevant first.
    async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// What one [`RagPipeline::ingest_batch`] call indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    /// Documents that produced no chunks, such as image-only pages.
    pub empty_documents: usize,
    pub chunks: usize,
}

pub struct RagPipeline {
    config: RagConfig,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Create the collection, sized to the embedder's output.
    pub async fn create_collection(&self) -> Result<()> {
        let dimensions = self.embedder.dimensions();
        self.store.create_collection(&self.collection, dimensions).await.map_err(|e| {
            error!(collection = %self.collection, dimensions, error = %e, "cannot create collection");
            RagError::Pipeline(format!("cannot create collection '{}': {e}", self.collection))
        })
    }

    /// Chunk, embed and store one document, returning its stored chunks.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<Chunk>> {
        let chunks = self.chunker.chunk(document);
        debug!(document.id = %document.id, chunks = chunks.len(), "chunked document");
        self.embed_and_store(chunks).await
    }

    /// Chunk every document, then embed and store the chunks in batches of
    /// [`EMBED_BATCH_SIZE`].
    ///
    /// Stops at the first failing batch; earlier batches stay indexed.
    pub async fn ingest_batch(&self, documents: &[Document]) -> Result<IndexStats> {
        let mut stats = IndexStats { documents: documents.len(), ..IndexStats::default() };
        let mut pending = Vec::new();
        for document in documents {
            let chunks = self.chunker.chunk(document);
            if chunks.is_empty() {
                stats.empty_documents += 1;
            }
            pending.extend(chunks);
        }

        stats.chunks = self.embed_and_store(pending).await?.len();
        info!(
            documents = stats.documents,
            empty_documents = stats.empty_documents,
            chunks = stats.chunks,
            "indexed documents"
        );
        Ok(stats)
    }

    async fn embed_and_store(&self, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        for batch in chunks.chunks_mut(EMBED_BATCH_SIZE) {
            let first = batch[0].document_id.clone();
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();

            let vectors = self.embedder.embed_batch(&texts).await.map_err(|e| {
                error!(document.id = %first, batch = texts.len(), error = %e, "embedding failed");
                RagError::Pipeline(format!("embedding chunks of '{first}' failed: {e}"))
            })?;
            if vectors.len() != texts.len() {
                return Err(RagError::Pipeline(format!(
                    "embedder returned {} vectors for {} chunks starting in '{first}'",
                    vectors.len(),
                    texts.len()
                )));
            }
            for (chunk, vector) in batch.iter_mut().zip(vectors) {
                chunk.embedding = vector;
            }

            self.store.upsert(&self.collection, batch).await.map_err(|e| {
                error!(document.id = %first, error = %e, "upsert failed");
                RagError::Pipeline(format!("storing chunks of '{first}' failed: {e}"))
            })?;
            debug!(document.id = %first, chunks = batch.len(), "stored batch");
        }
        Ok(chunks)
    }

    /// Embed `query` and return up to `top_k` chunks, best first, minus any
    /// under the similarity threshold.
    pub async fn query(&self, query: &str) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "cannot embed question");
            RagError::Pipeline(format!("embedding the question failed: {e}"))
        })?;

        let mut hits =
            self.store.search(&self.collection, &vector, self.config.top_k).await.map_err(|e| {
                error!(collection = %self.collection, error = %e, "search failed");
                RagError::Pipeline(format!("search in '{}' failed: {e}", self.collection))
            })?;
        if let Some(threshold) = self.config.similarity_threshold {
            hits.retain(|hit| hit.score >= threshold);
        }

        info!(hits = hits.len(), best = hits.first().map(|h| h.score), "retrieved context");
        Ok(hits)
    }
}

#[async_trait]
impl Retriever for RagPipeline {
    async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.query(query).await
    }
}

/// Collects the pipeline's parts. Everything but the collection name is
/// required.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    collection: Option<String>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Defaults to [`DEFAULT_COLLECTION`].
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    pub fn build(self) -> Result<RagPipeline> {
        fn required<T>(part: Option<T>, name: &str) -> Result<T> {
            part.ok_or_else(|| RagError::config(format!("pipeline needs {name}")))
        }

        let config = required(self.config, "a config")?;
        config.validate()?;
        Ok(RagPipeline {
            config,
            collection: self.collection.unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            embedder: required(self.embedder, "an embedding provider")?,
            store: required(self.store, "a vector store")?,
            chunker: required(self.chunker, "a chunker")?,
        })
    }
}
