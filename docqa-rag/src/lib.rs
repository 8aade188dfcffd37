//! # docqa-rag
//!
//! Retrieval-augmented question answering over folders of PDF documents.
//!
//! ## Overview
//!
//! - [`PdfFolderLoader`] turns each PDF page into a [`Document`]
//! - [`FixedSizeChunker`] and [`RecursiveChunker`] split documents into [`Chunk`]s
//! - [`EmbeddingProvider`] implementations embed chunks:
//!   [`HashEmbeddingProvider`] (offline), [`OpenAIEmbeddingProvider`], and
//!   `FastEmbedProvider` behind the `fastembed` feature
//! - [`InMemoryVectorStore`] indexes embeddings for exact cosine top-K search
//! - [`RagPipeline`] ties chunking, embedding and search together and acts as
//!   the [`Retriever`]
//! - [`RetrievalChain`] formats retrieved context with a [`PromptTemplate`]
//!   and asks a [`Generator`] such as [`ChatCompletionsClient`] for the answer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::*;
//!
//! let report = PdfFolderLoader::new().load("10k_pdf")?;
//!
//! let pipeline = Arc::new(
//!     RagPipeline::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!         .vector_store(Arc::new(InMemoryVectorStore::new()))
//!         .chunker(Arc::new(FixedSizeChunker::new(1000, 200)))
//!         .build()?,
//! );
//! pipeline.create_collection().await?;
//! pipeline.ingest_batch(&report.documents).await?;
//!
//! let llm = Arc::new(ChatCompletionsClient::new(LlmConfig::groq(api_key))?);
//! let chain = RetrievalChain::new(pipeline, llm);
//! println!("{}", chain.answer("What was net revenue?").await?.answer);
//! ```

pub mod chain;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod llm;
pub mod loader;
#[cfg(feature = "fastembed")]
pub mod minilm;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod vectorstore;

pub use chain::{Answer, RetrievalChain};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use llm::{ChatCompletionsClient, Generator, LlmConfig};
pub use loader::{LoadFailure, LoadReport, LopdfExtractor, PageExtractor, PdfFolderLoader};
#[cfg(feature = "fastembed")]
pub use minilm::FastEmbedProvider;
pub use openai::OpenAIEmbeddingProvider;
pub use pipeline::{IndexStats, RagPipeline, RagPipelineBuilder, Retriever};
pub use prompt::{ChatMessage, PromptTemplate, Role};
pub use vectorstore::VectorStore;
