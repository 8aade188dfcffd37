//! Prompt assembly for retrieval-augmented answers.

use serde::{Deserialize, Serialize};

use crate::document::SearchResult;

/// The default system instruction. `{context}` is replaced with the
/// retrieved chunk texts.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\n{context}";

/// The default human message; `{input}` is replaced with the question.
pub const DEFAULT_HUMAN_PROMPT: &str = "{input}";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const INPUT_PLACEHOLDER: &str = "{input}";

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A two-message prompt: a system instruction carrying the retrieved context
/// and a human message carrying the question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    system: String,
    human: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { system: DEFAULT_SYSTEM_PROMPT.to_string(), human: DEFAULT_HUMAN_PROMPT.to_string() }
    }
}

impl PromptTemplate {
    /// Create a template from custom system and human templates.
    ///
    /// Placeholders are `{context}` and `{input}`; either may appear in
    /// either template.
    pub fn new(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self { system: system.into(), human: human.into() }
    }

    /// Render the messages for `question` given the retrieved `context`.
    ///
    /// Chunk texts are joined by a blank line, in retrieval order.
    pub fn format(&self, question: &str, context: &[SearchResult]) -> Vec<ChatMessage> {
        let context_text = format_context(context);
        vec![
            ChatMessage::system(fill(&self.system, &context_text, question)),
            ChatMessage::user(fill(&self.human, &context_text, question)),
        ]
    }
}

/// Join retrieved chunk texts the way a "stuff documents" prompt expects.
pub fn format_context(context: &[SearchResult]) -> String {
    context.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

// Substitute both placeholders in one pass so text pulled in from documents
// is never itself treated as a template.
fn fill(template: &str, context: &str, input: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + input.len());
    let mut rest = template;
    loop {
        let next_context = rest.find(CONTEXT_PLACEHOLDER);
        let next_input = rest.find(INPUT_PLACEHOLDER);
        let (pos, placeholder, value) = match (next_context, next_input) {
            (Some(c), Some(i)) if c < i => (c, CONTEXT_PLACEHOLDER, context),
            (Some(_), Some(i)) => (i, INPUT_PLACEHOLDER, input),
            (Some(c), None) => (c, CONTEXT_PLACEHOLDER, context),
            (None, Some(i)) => (i, INPUT_PLACEHOLDER, input),
            (None, None) => break,
        };
        out.push_str(&rest[..pos]);
        out.push_str(value);
        rest = &rest[pos + placeholder.len()..];
    }
    out.push_str(rest);
    out
}
