//! HR routes: candidate screening and CV management

use crate::agents::hiring::{DEFAULT_FINAL_CANDIDATES, DEFAULT_INITIAL_RETRIEVAL};
use crate::agents::HiringAgent;
use crate::server::{require_role, ApiError, AppContext};
use crate::types::UserRole;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::warn;

/// CV upload extensions accepted by the portal
const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

/// HR route table
pub fn router() -> Router<AppContext> {
    Router::new()
        .route("/process_hiring", post(process_hiring))
        .route("/upload_cv", post(upload_cv))
        .route("/cv_stats", get(cv_stats))
        .route("/search_cvs", post(search_cvs))
}

/// Route to the hiring agent or report why it is unavailable
async fn hiring_agent(ctx: &AppContext) -> Result<crate::orchestrator::RouteOutcome, ApiError> {
    let outcome = ctx
        .orchestrator
        .route(UserRole::Hr.as_str(), None, None)
        .await;
    if outcome.agent.is_none() {
        return Err(ApiError::internal(
            outcome
                .error
                .unwrap_or_else(|| "Hiring agent not available".to_string()),
        ));
    }
    Ok(outcome)
}

#[derive(Debug, Deserialize)]
struct HiringRequest {
    job_description: String,
    initial_retrieval: Option<usize>,
    final_candidates: Option<usize>,
}

async fn process_hiring(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(request): Json<HiringRequest>,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    let job_description = request.job_description.trim();
    if job_description.is_empty() {
        return Err(ApiError::bad_request("Job description is required"));
    }

    let outcome = hiring_agent(&ctx).await?;
    let Some(agent) = outcome.downcast::<HiringAgent>() else {
        return Err(ApiError::internal("Hiring agent not available"));
    };

    let candidates = agent
        .process_job_hiring(
            job_description,
            request.initial_retrieval.unwrap_or(DEFAULT_INITIAL_RETRIEVAL),
            request.final_candidates.unwrap_or(DEFAULT_FINAL_CANDIDATES),
        )
        .await?;

    Ok(Json(json!({
        "candidates": candidates,
        "total_candidates": candidates.len(),
        "status": "success",
    })))
}

/// Whether a filename carries an accepted CV extension
fn allowed_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
}

async fn upload_cv(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        // Drop any path components a client may have sent along.
        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("No file selected"))?;
        if !allowed_file(&filename) {
            return Err(ApiError::bad_request(
                "Invalid file type. Allowed: PDF, DOCX, TXT",
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Could not read upload: {e}")))?;

        // Keep the raw upload on disk alongside the indexed text.
        let upload_dir = ctx.config.upload_dir.clone();
        if let Err(err) = tokio::fs::create_dir_all(&upload_dir).await {
            warn!("could not create upload directory: {err}");
        } else if let Err(err) = tokio::fs::write(upload_dir.join(&filename), &data).await {
            warn!(filename = %filename, "could not persist uploaded file: {err}");
        }

        let content = String::from_utf8_lossy(&data).into_owned();

        let outcome = hiring_agent(&ctx).await?;
        let Some(agent) = outcome.downcast::<HiringAgent>() else {
            return Err(ApiError::internal("Hiring agent not available"));
        };
        agent.add_cv(&filename, &content, None).await?;

        return Ok(Json(json!({
            "message": "CV uploaded successfully",
            "filename": filename,
            "status": "success",
        })));
    }

    Err(ApiError::bad_request("No file provided"))
}

async fn cv_stats(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    let outcome = hiring_agent(&ctx).await?;
    let Some(agent) = outcome.agent.as_ref() else {
        return Err(ApiError::internal("Hiring agent not available"));
    };
    Ok(Json(agent.stats().await?))
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    job_description: String,
    limit: Option<usize>,
}

async fn search_cvs(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Value>, ApiError> {
    require_role(&ctx, &headers, UserRole::Hr)?;

    let job_description = request.job_description.trim();
    if job_description.is_empty() {
        return Err(ApiError::bad_request("Job description is required"));
    }

    let outcome = hiring_agent(&ctx).await?;
    let Some(agent) = outcome.downcast::<HiringAgent>() else {
        return Err(ApiError::internal("Hiring agent not available"));
    };

    let results = agent
        .search_cvs(job_description, request.limit.unwrap_or(10))
        .await?;
    Ok(Json(json!({
        "results": results,
        "total_results": results.len(),
        "status": "success",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file_extensions() {
        assert!(allowed_file("resume.pdf"));
        assert!(allowed_file("resume.DOCX"));
        assert!(allowed_file("resume.txt"));
        assert!(!allowed_file("resume.exe"));
        assert!(!allowed_file("resume"));
        assert!(!allowed_file(".pdf"));
    }
}
