//! Agent implementations behind the orchestrator
//!
//! Each agent is a self-contained domain handler: document Q&A for
//! employees, candidate screening for HR, and email drafting. The
//! orchestrator stores them as `Arc<dyn Agent>`; route handlers downcast to
//! the concrete type for domain operations.

pub mod email;
pub mod hiring;
pub mod rag;

// Re-exports
pub use email::{EmailAgent, EmailOutcome};
pub use hiring::{CandidateReport, CvMatch, HiringAgent, HiringDecision};
pub use rag::DocQaAgent;

use crate::config::AppConfig;
use crate::error::Result;
use crate::llm_client::LlmClient;
use crate::openrouter::OpenRouterClient;
use crate::orchestrator::registry::{EMAIL_AGENT, HIRING_AGENT, RAG_AGENT};
use crate::orchestrator::{AgentConstructor, ConstructionError};
use crate::storage::{CvStore, Database, DocStore, MailStore};
use crate::types::UserRole;
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

/// Common surface of every registered agent
///
/// Domain operations live on the concrete types; the registry only needs a
/// name, optional statistics, and a downcast hook.
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    /// Registry name of the agent
    fn name(&self) -> &str;

    /// Agent statistics for dashboards; `Null` when the agent has none
    async fn stats(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    /// Downcast hook for route handlers
    fn as_any(&self) -> &dyn Any;
}

/// Build the constructors for the portal's known agent kinds
///
/// The document Q&A and hiring agents require an LLM client and fail
/// construction without an API key; the email agent comes up without one and
/// degrades to mailbox browsing only.
pub fn builtin_constructors(config: Arc<AppConfig>, db: Database) -> Vec<AgentConstructor> {
    let rag = {
        let config = config.clone();
        let db = db.clone();
        AgentConstructor::new(RAG_AGENT, Some(UserRole::Employee.as_str()), move || {
            let config = config.clone();
            let db = db.clone();
            async move {
                let client = OpenRouterClient::new(config.llm.clone())
                    .map_err(|e| ConstructionError::new(RAG_AGENT, e))?;
                let agent = DocQaAgent::new(
                    DocStore::new(db.pool()),
                    Arc::new(client),
                    config.llm.default_model.clone(),
                );
                Ok(Arc::new(agent) as Arc<dyn Agent>)
            }
        })
    };

    let hiring = {
        let config = config.clone();
        let db = db.clone();
        AgentConstructor::new(HIRING_AGENT, Some(UserRole::Hr.as_str()), move || {
            let config = config.clone();
            let db = db.clone();
            async move {
                let client = OpenRouterClient::new(config.llm.clone())
                    .map_err(|e| ConstructionError::new(HIRING_AGENT, e))?;
                let agent = HiringAgent::new(
                    CvStore::new(db.pool()),
                    Arc::new(client),
                    config.llm.default_model.clone(),
                );
                Ok(Arc::new(agent) as Arc<dyn Agent>)
            }
        })
    };

    // No role: the email agent is reachable only by explicit name.
    let email = AgentConstructor::new(EMAIL_AGENT, None, move || {
        let config = config.clone();
        let db = db.clone();
        async move {
            let client = OpenRouterClient::new(config.llm.clone())
                .ok()
                .map(|c| Arc::new(c) as Arc<dyn LlmClient>);
            let agent = EmailAgent::connect(
                MailStore::new(db.pool()),
                client,
                config.mail_sender.clone(),
                config.llm.default_model.clone(),
            )
            .await
            .map_err(|e| ConstructionError::new(EMAIL_AGENT, e))?;
            Ok(Arc::new(agent) as Arc<dyn Agent>)
        }
    });

    vec![rag, hiring, email]
}

/// Extract the first JSON object from raw LLM output
///
/// Tolerates code fences and prose around the payload by slicing from the
/// first `{` to the last `}`.
pub(crate) fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end >= start).then(|| &raw[start..=end])
}

/// Lowercased alphanumeric terms of at least three characters
///
/// Shared tokenizer for the keyword-overlap ranking used by retrieval and
/// CV search.
pub(crate) fn index_terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
        assert_eq!(
            extract_json_object("```json\n{\"a\": 1}\n```"),
            Some(r#"{"a": 1}"#)
        );
        assert_eq!(
            extract_json_object("Here you go: {\"a\": {\"b\": 2}} done"),
            Some(r#"{"a": {"b": 2}}"#)
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} reversed {"), None);
    }

    #[test]
    fn test_index_terms() {
        let terms = index_terms("Senior Rust engineer, 5 yrs of Rust!");
        assert!(terms.contains("rust"));
        assert!(terms.contains("engineer"));
        assert!(terms.contains("senior"));
        // Short tokens are dropped.
        assert!(!terms.contains("of"));
        assert!(!terms.contains("5"));
    }
}
