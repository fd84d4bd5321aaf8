//! Unified LLM client trait
//!
//! Agents hold an `Arc<dyn LlmClient>` so tests can substitute canned
//! responses for the real OpenRouter backend.

use crate::error::Result;
use crate::openrouter::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;

/// Unified trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the client type for debugging/logging
    fn client_type(&self) -> &str;
}
