//! Startup wiring: load, index, then hand the chain to the console loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docqa_rag::{
    ChatCompletionsClient, Chunker, EmbeddingProvider, FixedSizeChunker, HashEmbeddingProvider,
    InMemoryVectorStore, OpenAIEmbeddingProvider, PdfFolderLoader, RagConfig, RagPipeline,
    RecursiveChunker, RetrievalChain,
};
use tracing::{info, warn};

use crate::cli::ChunkerKind;
use crate::config::{AppConfig, EmbedderConfig};
use crate::console;

/// Run a full session against stdin and stdout.
pub async fn run(config: AppConfig) -> Result<()> {
    let pipeline = build_index(&config, &PdfFolderLoader::new()).await?;

    let llm = ChatCompletionsClient::new(config.llm.clone()).context("invalid model settings")?;
    info!(model = llm.model(), "chat model ready");
    let chain = RetrievalChain::new(pipeline, Arc::new(llm));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let summary = console::run_loop(&chain, stdin.lock(), stdout.lock(), config.output).await?;
    info!(answered = summary.answered, failed = summary.failed, "session ended");
    Ok(())
}

/// Load every page under the configured folder and index it into a fresh
/// in-memory collection.
pub async fn build_index(config: &AppConfig, loader: &PdfFolderLoader) -> Result<Arc<RagPipeline>> {
    let report = loader
        .load(&config.pdf_folder)
        .with_context(|| format!("failed to load PDFs from {}", config.pdf_folder.display()))?;
    for failure in &report.failures {
        warn!(file = %failure.path.display(), error = %failure.message, "file not indexed");
    }
    if report.documents.is_empty() {
        warn!(folder = %config.pdf_folder.display(), "no pages loaded; answers will have no context");
    }

    let pipeline = RagPipeline::builder()
        .config(config.rag.clone())
        .embedding_provider(build_embedder(&config.embedder, config.timeout)?)
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .chunker(build_chunker(config.chunker, &config.rag))
        .build()?;

    pipeline.create_collection().await?;
    pipeline.ingest_batch(&report.documents).await.context("indexing failed")?;
    Ok(Arc::new(pipeline))
}

pub fn build_chunker(kind: ChunkerKind, rag: &RagConfig) -> Arc<dyn Chunker> {
    match kind {
        ChunkerKind::Fixed => Arc::new(FixedSizeChunker::new(rag.chunk_size, rag.chunk_overlap)),
        ChunkerKind::Recursive => Arc::new(RecursiveChunker::new(rag.chunk_size, rag.chunk_overlap)),
    }
}

pub fn build_embedder(
    embedder: &EmbedderConfig,
    timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match embedder {
        EmbedderConfig::Hash => Arc::new(HashEmbeddingProvider::default()),
        EmbedderConfig::OpenAi { api_key, model } => Arc::new(
            OpenAIEmbeddingProvider::new(api_key.as_str())?
                .with_model(model.as_str())
                .with_timeout(timeout)?,
        ),
        EmbedderConfig::FastEmbed => fastembed_provider()?,
    };
    info!(dimensions = provider.dimensions(), "embedding provider ready");
    if let Some(note) = recall_note(embedder) {
        info!("{note}");
    }
    Ok(provider)
}

/// Startup hint for embedders whose retrieval is lexical only.
fn recall_note(embedder: &EmbedderConfig) -> Option<&'static str> {
    match embedder {
        EmbedderConfig::Hash => Some(
            "hash embedder matches shared words, not meaning; \
             use --embedder fastembed or --embedder openai for semantic retrieval",
        ),
        EmbedderConfig::OpenAi { .. } | EmbedderConfig::FastEmbed => None,
    }
}

#[cfg(feature = "fastembed")]
fn fastembed_provider() -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(docqa_rag::FastEmbedProvider::new()?))
}

#[cfg(not(feature = "fastembed"))]
fn fastembed_provider() -> Result<Arc<dyn EmbeddingProvider>> {
    anyhow::bail!("this build does not include the fastembed backend; rebuild with --features fastembed")
}
