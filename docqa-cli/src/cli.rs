//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Ask questions about a folder of PDF documents.
#[derive(Debug, Clone, Parser)]
#[command(name = "docqa", version, about)]
pub struct Cli {
    /// Folder containing the PDF files to index
    #[arg(long, env = "DOCQA_PDF_FOLDER", default_value = "10k_pdf")]
    pub pdf_folder: PathBuf,

    /// Chat model name
    #[arg(long, env = "DOCQA_MODEL", default_value = docqa_rag::llm::DEFAULT_MODEL)]
    pub model: String,

    /// OpenAI-compatible API base URL for the chat model
    #[arg(long, env = "DOCQA_BASE_URL", default_value = docqa_rag::llm::GROQ_API_BASE)]
    pub base_url: String,

    /// Sampling temperature (provider default if omitted)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Embedding backend
    #[arg(long, value_enum, env = "DOCQA_EMBEDDER", default_value_t = EmbedderKind::Hash)]
    pub embedder: EmbedderKind,

    /// Embedding model for the `openai` backend
    #[arg(long, default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    /// Text splitting strategy
    #[arg(long, value_enum, default_value_t = ChunkerKind::Fixed)]
    pub chunker: ChunkerKind,

    /// Maximum chunk length in characters
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, default_value_t = 4)]
    pub top_k: usize,

    /// Drop retrieved chunks scoring below this cosine similarity
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Timeout for each network request, in seconds
    #[arg(long, env = "DOCQA_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Print each answer as JSON including the retrieved context
    #[arg(long)]
    pub json: bool,

    /// List the source file and page of the retrieved chunks after each answer
    #[arg(long)]
    pub show_sources: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Offline hashed bag-of-words vectors
    Hash,
    /// OpenAI-compatible embeddings API (needs OPENAI_API_KEY)
    Openai,
    /// Local all-MiniLM-L6-v2 (requires the `fastembed` feature)
    Fastembed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChunkerKind {
    /// Sliding character window
    Fixed,
    /// Paragraph, line, then word boundaries
    Recursive,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "docqa",
            "--pdf-folder",
            "filings",
            "--chunker",
            "recursive",
            "--top-k",
            "6",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.pdf_folder, PathBuf::from("filings"));
        assert_eq!(cli.chunker, ChunkerKind::Recursive);
        assert_eq!(cli.top_k, 6);
        assert!(cli.json);
        assert!(!cli.show_sources);
    }

    #[test]
    fn rejects_unknown_embedder() {
        assert!(Cli::try_parse_from(["docqa", "--embedder", "bert"]).is_err());
    }
}
