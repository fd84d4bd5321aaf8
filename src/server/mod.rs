//! HTTP layer: application context, router assembly, and shared handler
//! plumbing
//!
//! The orchestrator and stores are constructed once at startup and handed to
//! every handler through axum state; there is no global instance.

pub mod auth_routes;
pub mod email_routes;
pub mod employee_routes;
pub mod hr_routes;

use crate::auth::{Session, SessionStore, SESSION_COOKIE};
use crate::config::AppConfig;
use crate::error::Error;
use crate::orchestrator::Orchestrator;
use crate::storage::UserStore;
use crate::types::UserRole;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Application context shared with every route handler
#[derive(Clone)]
pub struct AppContext {
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// The agent-routing orchestrator
    pub orchestrator: Arc<Orchestrator>,
    /// User account store
    pub users: UserStore,
    /// Active sessions
    pub sessions: Arc<SessionStore>,
}

/// JSON error response carrying an HTTP status
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Create an error with an explicit status
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(message) => Self::bad_request(message),
            Error::Auth(message) => Self::new(StatusCode::UNAUTHORIZED, message),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Extract the session token from the request cookies
pub(crate) fn session_token(headers: &HeaderMap) -> Option<Uuid> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

/// Resolve the session and require the given role
pub(crate) fn require_role(
    ctx: &AppContext,
    headers: &HeaderMap,
    role: UserRole,
) -> Result<Session, ApiError> {
    let token = session_token(headers).ok_or_else(ApiError::unauthorized)?;
    let session = ctx.sessions.get(&token).ok_or_else(ApiError::unauthorized)?;
    if session.role != role {
        return Err(ApiError::unauthorized());
    }
    Ok(session)
}

/// Build the full application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .nest("/auth", auth_routes::router())
        .nest("/employee", employee_routes::router())
        .nest("/hr", hr_routes::router())
        .nest("/email", email_routes::router())
        .with_state(ctx)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Orchestrator introspection: registered agents and the role mapping
async fn list_agents(
    State(ctx): State<AppContext>,
) -> Json<crate::orchestrator::AgentInventory> {
    Json(ctx.orchestrator.list_agents())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_parsing() {
        let token = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!(
                "theme=dark; {SESSION_COOKIE}={token}; other=1"
            ))
            .unwrap(),
        );
        assert_eq!(session_token(&headers), Some(token));
    }

    #[test]
    fn test_session_token_missing_or_malformed() {
        assert_eq!(session_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}=not-a-uuid")).unwrap(),
        );
        assert_eq!(session_token(&headers), None);
    }
}
