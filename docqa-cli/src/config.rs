//! Startup configuration assembled from arguments and the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use docqa_rag::{LlmConfig, RagConfig};

use crate::cli::{ChunkerKind, Cli, EmbedderKind};

/// Environment variable holding the chat provider key.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";
/// Lower-case spelling accepted for `.env` files written for older setups.
pub const API_KEY_FALLBACK_VAR: &str = "groq_api_key";
/// Key for the `openai` embedding backend.
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// How each answer is rendered on the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub json: bool,
    pub show_sources: bool,
}

/// Embedding backend selection with whatever it needs to start.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedderConfig {
    Hash,
    OpenAi { api_key: String, model: String },
    FastEmbed,
}

/// Everything the application needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pdf_folder: PathBuf,
    pub rag: RagConfig,
    pub chunker: ChunkerKind,
    pub embedder: EmbedderConfig,
    pub llm: LlmConfig,
    pub timeout: Duration,
    pub output: OutputOptions,
}

impl AppConfig {
    /// Resolve configuration from the process environment.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Self::resolve(cli, |name| std::env::var(name).ok())
    }

    /// Resolve configuration using `env` to look up variables.
    pub fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut rag = RagConfig::builder()
            .chunk_size(cli.chunk_size)
            .chunk_overlap(cli.chunk_overlap)
            .top_k(cli.top_k);
        if let Some(min_score) = cli.min_score {
            rag = rag.similarity_threshold(min_score);
        }
        let rag = rag.build().context("invalid retrieval settings")?;

        let api_key = lookup_non_empty(&env, API_KEY_VAR)
            .or_else(|| lookup_non_empty(&env, API_KEY_FALLBACK_VAR));
        let Some(api_key) = api_key else {
            bail!("{API_KEY_VAR} is not set; add it to the environment or a .env file");
        };

        let timeout = Duration::from_secs(cli.timeout_secs);
        let mut llm = LlmConfig::groq(api_key)
            .with_model(cli.model.clone())
            .with_base_url(cli.base_url.clone())
            .with_timeout(timeout);
        if let Some(temperature) = cli.temperature {
            llm = llm.with_temperature(temperature);
        }

        let embedder = match cli.embedder {
            EmbedderKind::Hash => EmbedderConfig::Hash,
            EmbedderKind::Fastembed => EmbedderConfig::FastEmbed,
            EmbedderKind::Openai => {
                let Some(api_key) = lookup_non_empty(&env, OPENAI_KEY_VAR) else {
                    bail!("{OPENAI_KEY_VAR} is required for --embedder openai");
                };
                EmbedderConfig::OpenAi { api_key, model: cli.embedding_model.clone() }
            }
        };

        Ok(Self {
            pdf_folder: cli.pdf_folder.clone(),
            rag,
            chunker: cli.chunker,
            embedder,
            llm,
            timeout,
            output: OutputOptions { json: cli.json, show_sources: cli.show_sources },
        })
    }
}

fn lookup_non_empty(env: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
