//! Retrieval chain: retrieve → prompt → generate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::document::SearchResult;
use crate::error::Result;
use crate::llm::Generator;
use crate::pipeline::Retriever;
use crate::prompt::PromptTemplate;

/// The result of answering one question.
///
/// Serializes as `{ "input": .., "context": [..], "answer": .. }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The question as asked.
    pub input: String,
    /// The retrieved chunks the answer was generated from, most relevant first.
    pub context: Vec<SearchResult>,
    /// The model's reply.
    pub answer: String,
}

/// Answers questions by stuffing retrieved chunks into a prompt.
pub struct RetrievalChain {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    prompt: PromptTemplate,
}

impl RetrievalChain {
    /// Create a chain with the default prompt.
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self { retriever, generator, prompt: PromptTemplate::default() }
    }

    /// Replace the prompt template.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Answer `question`.
    ///
    /// # Errors
    ///
    /// Propagates retrieval and generation errors unchanged.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let context = self.retriever.retrieve(question).await?;
        let messages = self.prompt.format(question, &context);

        let answer = self.generator.generate(&messages).await.inspect_err(|e| {
            error!(error = %e, "generation failed");
        })?;

        info!(context_chunks = context.len(), answer_len = answer.len(), "answered question");
        Ok(Answer { input: question.to_string(), context, answer })
    }
}
