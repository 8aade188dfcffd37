//! # docqa-cli
//!
//! The `docqa` console: index a folder of PDFs at startup, then answer
//! questions typed on stdin from the indexed pages.
//!
//! The binary is a thin shell over [`app::run`]; the pieces are public so
//! sessions can be driven with other inputs, outputs or models.

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod logging;

pub use cli::{ChunkerKind, Cli, EmbedderKind};
pub use config::{AppConfig, EmbedderConfig, OutputOptions};
pub use console::{SessionSummary, run_loop};
