//! Email-generation agent
//!
//! Turns a free-text request into a drafted email via the LLM and records it
//! in the mailbox store. Also exposes mailbox browsing for the HR email
//! dashboard. The LLM client is optional: without one the agent still serves
//! the mailbox but refuses drafting requests.

use crate::agents::{extract_json_object, Agent};
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message};
use crate::orchestrator::registry::EMAIL_AGENT;
use crate::storage::{EmailStats, MailRecord, MailStore, NewMail, ThreadSummary};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

const DRAFT_PROMPT: &str = "You draft professional HR emails. From the user's request, reply \
    with a single JSON object with fields: recipient (email address), subject (string), \
    body (plain-text email body), email_type (short category such as offer, rejection, \
    meeting, followup).";

/// Parsed LLM draft; validated before anything is stored
#[derive(Debug, Clone, Deserialize)]
struct EmailDraft {
    recipient: Option<String>,
    subject: Option<String>,
    body: Option<String>,
    email_type: Option<String>,
}

/// Result of an email-generation request
#[derive(Debug, Clone, Serialize)]
pub struct EmailOutcome {
    /// Whether an email was drafted and recorded
    pub success: bool,
    /// Human-readable status message
    pub message: String,
    /// Recipient of the drafted email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Subject of the drafted email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Body of the drafted email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Thread id the email was recorded under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl EmailOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            recipient: None,
            subject: None,
            body: None,
            thread_id: None,
        }
    }
}

/// Email agent backed by the mailbox store and an optional LLM
pub struct EmailAgent {
    mail: MailStore,
    client: Option<Arc<dyn LlmClient>>,
    sender: String,
    model: String,
}

impl EmailAgent {
    /// Create the agent, ensuring the mailbox schema exists
    pub async fn connect(
        mail: MailStore,
        client: Option<Arc<dyn LlmClient>>,
        sender: String,
        model: String,
    ) -> Result<Self> {
        mail.migrate().await?;
        Ok(Self {
            mail,
            client,
            sender,
            model,
        })
    }

    /// Draft an email from a free-text request and record it as sent
    pub async fn process_email_request(&self, user_query: &str) -> Result<EmailOutcome> {
        let user_query = user_query.trim();
        if user_query.is_empty() {
            return Err(Error::invalid_input("query is required"));
        }

        let Some(client) = &self.client else {
            return Ok(EmailOutcome::failure(
                "Email drafting is unavailable: no LLM client configured",
            ));
        };

        let request = CompletionRequest::new(
            &self.model,
            vec![Message::system(DRAFT_PROMPT), Message::user(user_query)],
        )
        .with_temperature(0.4)
        .with_max_tokens(1000);

        let response = client.complete(request).await?;
        let raw = response
            .text()
            .ok_or_else(|| Error::agent("empty completion from LLM"))?;

        let draft: EmailDraft = match extract_json_object(raw)
            .and_then(|payload| serde_json::from_str(payload).ok())
        {
            Some(draft) => draft,
            None => {
                return Ok(EmailOutcome::failure(
                    "Could not parse a draft from the model output",
                ))
            }
        };

        let recipient = draft.recipient.unwrap_or_default();
        if !recipient.contains('@') {
            return Ok(EmailOutcome::failure(format!(
                "Draft has no valid recipient address: {recipient:?}"
            )));
        }
        let subject = draft.subject.unwrap_or_else(|| "(No Subject)".to_string());
        let body = draft.body.unwrap_or_default();
        if body.trim().is_empty() {
            return Ok(EmailOutcome::failure("Draft has an empty body"));
        }

        let thread_id = Uuid::new_v4().to_string();
        self.mail
            .insert(&NewMail {
                direction: "sent".to_string(),
                sender_email: self.sender.clone(),
                recipient_email: recipient.clone(),
                subject: subject.clone(),
                body: body.clone(),
                status: "sent".to_string(),
                email_type: draft.email_type,
                thread_id: thread_id.clone(),
                in_reply_to: None,
            })
            .await?;

        Ok(EmailOutcome {
            success: true,
            message: format!("Email to {recipient} drafted and recorded"),
            recipient: Some(recipient),
            subject: Some(subject),
            body: Some(body),
            thread_id: Some(thread_id),
        })
    }

    /// Summaries of the most recently active threads
    pub async fn inbox_threads(&self, limit: i64) -> Result<Vec<ThreadSummary>> {
        self.mail.inbox_threads(limit).await
    }

    /// All messages in a thread, oldest first
    pub async fn thread_messages(&self, thread_id: &str) -> Result<Vec<MailRecord>> {
        self.mail.thread_messages(thread_id).await
    }

    /// Most recent sent messages
    pub async fn sent_emails(&self, limit: i64) -> Result<Vec<MailRecord>> {
        self.mail.sent_emails(limit).await
    }

    /// Mailbox statistics
    pub async fn email_stats(&self) -> Result<EmailStats> {
        self.mail.stats().await
    }
}

#[async_trait]
impl Agent for EmailAgent {
    fn name(&self) -> &str {
        EMAIL_AGENT
    }

    async fn stats(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.mail.stats().await?)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::StaticLlm;
    use crate::storage::Database;

    async fn agent_with(reply: Option<&str>) -> EmailAgent {
        let db = Database::in_memory().await.unwrap();
        EmailAgent::connect(
            MailStore::new(db.pool()),
            reply.map(StaticLlm::shared),
            "hr@peopledesk.local".to_string(),
            "test-model".to_string(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_drafts_and_records_email() {
        let reply = r#"```json
{"recipient": "alice@example.com", "subject": "Interview invitation",
 "body": "We would like to invite you to interview.", "email_type": "meeting"}
```"#;
        let agent = agent_with(Some(reply)).await;

        let outcome = agent
            .process_email_request("Invite Alice to an interview next week")
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.recipient.as_deref(), Some("alice@example.com"));
        assert!(outcome.thread_id.is_some());

        let sent = agent.sent_emails(10).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject.as_deref(), Some("Interview invitation"));
        assert_eq!(
            sent[0].sender_email.as_deref(),
            Some("hr@peopledesk.local")
        );

        let stats = agent.email_stats().await.unwrap();
        assert_eq!(stats.sent_emails, 1);
        assert_eq!(stats.top_email_types[0].email_type, "meeting");
    }

    #[tokio::test]
    async fn test_rejects_draft_without_recipient() {
        let reply = r#"{"subject": "Hi", "body": "Hello"}"#;
        let agent = agent_with(Some(reply)).await;

        let outcome = agent.process_email_request("say hi").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("recipient"));
        assert!(agent.sent_emails(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_draft_is_reported() {
        let agent = agent_with(Some("I cannot help with that.")).await;
        let outcome = agent.process_email_request("draft something").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("parse"));
    }

    #[tokio::test]
    async fn test_without_llm_client_browsing_still_works() {
        let agent = agent_with(None).await;

        let outcome = agent.process_email_request("draft something").await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("unavailable"));

        assert!(agent.inbox_threads(10).await.unwrap().is_empty());
        assert_eq!(agent.email_stats().await.unwrap().total_emails, 0);
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let agent = agent_with(None).await;
        assert!(agent.process_email_request("  ").await.is_err());
    }
}
