//! The interactive question/answer loop.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use docqa_rag::{Answer, RetrievalChain};
use tracing::warn;

use crate::config::OutputOptions;

pub const GREETING: &str = "Type 'q' to exit.";
pub const PROMPT: &str = "\nEnter your question: ";
pub const FAREWELL: &str = "Exiting.";

/// Turn counts for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub answered: usize,
    pub failed: usize,
}

/// Read questions from `input` until `q` or end of input, answering each
/// with `chain` and writing the transcript to `output`.
///
/// A question that fails to answer is reported and the loop keeps going.
/// Only I/O errors on `input` or `output` end the session early.
pub async fn run_loop<R, W>(
    chain: &RetrievalChain,
    mut input: R,
    mut output: W,
    options: OutputOptions,
) -> Result<SessionSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = SessionSummary::default();
    writeln!(output, "{GREETING}")?;

    let mut line = String::new();
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        line.clear();
        // Blocking read: the session waits on the user, and nothing else runs
        // on the runtime between questions.
        if input.read_line(&mut line).context("failed to read question")? == 0 {
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if question.eq_ignore_ascii_case("q") {
            writeln!(output, "{FAREWELL}")?;
            break;
        }
        if question.is_empty() {
            continue;
        }

        match chain.answer(question).await {
            Ok(answer) => {
                render_answer(&mut output, &answer, options)?;
                summary.answered += 1;
            }
            Err(e) => {
                warn!(error = %e, "question failed");
                writeln!(output, "Error: {e}")?;
                summary.failed += 1;
            }
        }
    }

    output.flush()?;
    Ok(summary)
}

fn render_answer(output: &mut impl Write, answer: &Answer, options: OutputOptions) -> Result<()> {
    if options.json {
        writeln!(output, "{}", serde_json::to_string_pretty(answer)?)?;
    } else {
        writeln!(output, "\nAnswer:\n{}", answer.answer)?;
    }

    if options.show_sources {
        let sources = sources(answer);
        if !sources.is_empty() {
            writeln!(output, "Sources:")?;
            for source in sources {
                writeln!(output, "  - {source}")?;
            }
        }
    }
    Ok(())
}

/// Distinct `file (page n)` labels for the answer's context, in retrieval
/// order. Pages are shown one-based.
fn sources(answer: &Answer) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for result in &answer.context {
        let chunk = &result.chunk;
        let label = match (chunk.source(), chunk.page()) {
            (Some(source), Some(page)) => format!("{source} (page {})", page + 1),
            (Some(source), None) => source.to_string(),
            _ => chunk.id.clone(),
        };
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}
