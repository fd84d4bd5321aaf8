//! Employee routes: document Q&A

use crate::agents::DocQaAgent;
use crate::server::{require_role, ApiError, AppContext};
use crate::types::UserRole;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

/// Employee route table
pub fn router() -> Router<AppContext> {
    Router::new()
        .route("/query", post(query))
        .route("/stats", get(stats))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    question: String,
}

async fn query(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Employee)?;

    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("Question is required"));
    }

    let outcome = ctx
        .orchestrator
        .route(UserRole::Employee.as_str(), Some(question), None)
        .await;
    let Some(agent) = outcome.downcast::<DocQaAgent>() else {
        return Err(ApiError::internal(
            outcome
                .error
                .clone()
                .unwrap_or_else(|| "RAG agent not available".to_string()),
        ));
    };

    let answer = agent.query(question).await?;
    Ok(Json(json!({
        "question": question,
        "answer": answer,
        "status": "success",
    })))
}

async fn stats(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Employee)?;

    let outcome = ctx
        .orchestrator
        .route(UserRole::Employee.as_str(), None, None)
        .await;
    let Some(agent) = outcome.agent.as_ref() else {
        return Err(ApiError::internal(
            outcome
                .error
                .clone()
                .unwrap_or_else(|| "RAG agent not available".to_string()),
        ));
    };

    Ok(Json(agent.stats().await?))
}
