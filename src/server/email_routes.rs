//! Email routes: mailbox browsing and email generation
//!
//! All email traffic routes to the agent by explicit name; the email agent
//! holds no role in the role mapping.

use crate::agents::EmailAgent;
use crate::orchestrator::EMAIL_AGENT;
use crate::server::{require_role, ApiError, AppContext};
use crate::types::UserRole;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

/// Email route table
pub fn router() -> Router<AppContext> {
    Router::new()
        .route("/inbox", get(inbox))
        .route("/thread/:thread_id", get(thread_view))
        .route("/sent", get(sent))
        .route("/stats", get(stats))
        .route("/send", post(send_email))
}

/// Route to the email agent by explicit name
async fn email_agent(ctx: &AppContext) -> Result<crate::orchestrator::RouteOutcome, ApiError> {
    let outcome = ctx
        .orchestrator
        .route(UserRole::Hr.as_str(), None, Some(EMAIL_AGENT))
        .await;
    if outcome.agent.is_none() {
        return Err(ApiError::internal(
            outcome
                .error
                .unwrap_or_else(|| "Email agent not available".to_string()),
        ));
    }
    Ok(outcome)
}

async fn inbox(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    let outcome = email_agent(&ctx).await?;
    let Some(agent) = outcome.downcast::<EmailAgent>() else {
        return Err(ApiError::internal("Email agent not available"));
    };

    let threads = agent.inbox_threads(100).await?;
    Ok(Json(json!({ "threads": threads, "status": "success" })))
}

async fn thread_view(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(thread_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    let outcome = email_agent(&ctx).await?;
    let Some(agent) = outcome.downcast::<EmailAgent>() else {
        return Err(ApiError::internal("Email agent not available"));
    };

    let messages = agent.thread_messages(&thread_id).await?;
    if messages.is_empty() {
        return Err(ApiError::not_found("Thread not found"));
    }
    let subject = messages[0]
        .subject
        .clone()
        .unwrap_or_else(|| "(No Subject)".to_string());

    Ok(Json(json!({
        "thread_id": thread_id,
        "subject": subject,
        "messages": messages,
        "status": "success",
    })))
}

async fn sent(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    let outcome = email_agent(&ctx).await?;
    let Some(agent) = outcome.downcast::<EmailAgent>() else {
        return Err(ApiError::internal("Email agent not available"));
    };

    let emails = agent.sent_emails(100).await?;
    Ok(Json(json!({ "emails": emails, "status": "success" })))
}

async fn stats(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    let outcome = email_agent(&ctx).await?;
    let Some(agent) = outcome.agent.as_ref() else {
        return Err(ApiError::internal("Email agent not available"));
    };
    Ok(Json(agent.stats().await?))
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    query: String,
}

async fn send_email(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(request): Json<SendRequest>,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }

    let outcome = email_agent(&ctx).await?;
    let Some(agent) = outcome.downcast::<EmailAgent>() else {
        return Err(ApiError::internal("Email agent not available"));
    };

    let result = agent.process_email_request(query).await?;
    Ok(Json(serde_json::to_value(result).map_err(crate::error::Error::from)?))
}
