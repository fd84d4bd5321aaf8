//! Document question-answering agent
//!
//! Answers employee questions against the company-document index: ranks
//! documents by keyword overlap with the question, then asks the LLM to
//! answer grounded in the retrieved excerpts.

use crate::agents::{index_terms, Agent};
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message};
use crate::orchestrator::registry::RAG_AGENT;
use crate::storage::{DocRecord, DocStore};
use async_trait::async_trait;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;

/// Number of documents handed to the LLM per question
const TOP_DOCS: usize = 4;

/// Characters of each document included in the prompt
const EXCERPT_CHARS: usize = 1200;

const SYSTEM_PROMPT: &str = "You are an HR assistant answering employee questions about \
    company documents. Answer only from the provided excerpts. When the excerpts do not \
    contain the answer, say so plainly.";

/// Document Q&A agent backed by the document index and an LLM
pub struct DocQaAgent {
    docs: DocStore,
    client: Arc<dyn LlmClient>,
    model: String,
}

impl DocQaAgent {
    /// Create the agent over a document store and LLM client
    pub fn new(docs: DocStore, client: Arc<dyn LlmClient>, model: String) -> Self {
        Self {
            docs,
            client,
            model,
        }
    }

    /// Answer a question from the indexed documents
    pub async fn query(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::invalid_input("question is required"));
        }

        let relevant = self.retrieve(question, TOP_DOCS).await?;
        if relevant.is_empty() {
            return Ok("No relevant documents were found for this question.".to_string());
        }

        let mut context = String::new();
        for doc in &relevant {
            let excerpt: String = doc.content.chars().take(EXCERPT_CHARS).collect();
            context.push_str(&format!("## {}\n{}\n\n", doc.title, excerpt));
        }

        let request = CompletionRequest::new(
            &self.model,
            vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(format!(
                    "Document excerpts:\n\n{context}\nQuestion: {question}"
                )),
            ],
        )
        .with_temperature(0.2)
        .with_max_tokens(800);

        let response = self.client.complete(request).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| Error::agent("empty completion from LLM"))
    }

    /// Titles of all indexed documents
    pub async fn list_documents(&self) -> Result<Vec<String>> {
        self.docs.titles().await
    }

    async fn retrieve(&self, question: &str, limit: usize) -> Result<Vec<DocRecord>> {
        let question_terms = index_terms(question);
        let mut scored: Vec<(usize, DocRecord)> = self
            .docs
            .all()
            .await?
            .into_iter()
            .filter_map(|doc| {
                let content_terms = index_terms(&doc.content);
                let title_terms = index_terms(&doc.title);
                let score = question_terms
                    .iter()
                    .map(|term| {
                        // Title hits weigh more than body hits.
                        match (title_terms.contains(term), content_terms.contains(term)) {
                            (true, _) => 3,
                            (false, true) => 1,
                            (false, false) => 0,
                        }
                    })
                    .sum::<usize>();
                (score > 0).then_some((score, doc))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, doc)| doc).collect())
    }
}

#[async_trait]
impl Agent for DocQaAgent {
    fn name(&self) -> &str {
        RAG_AGENT
    }

    async fn stats(&self) -> Result<serde_json::Value> {
        Ok(json!({ "documents": self.docs.count().await? }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
