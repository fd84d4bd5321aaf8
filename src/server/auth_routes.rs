//! Authentication routes: signup, login, logout

use crate::auth::{hash_password, verify_password, SESSION_COOKIE};
use crate::server::{session_token, ApiError, AppContext};
use crate::types::UserRole;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::AppendHeaders;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Auth route table
pub fn router() -> Router<AppContext> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    username: String,
    email: String,
    password: String,
    role: String,
}

async fn signup(
    State(ctx): State<AppContext>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.username.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(ApiError::bad_request("Please fill in all fields"));
    }
    let role = request
        .role
        .parse::<UserRole>()
        .map_err(|_| ApiError::bad_request("Invalid role selected"))?;

    if ctx.users.find_by_username(&request.username).await?.is_some() {
        return Err(ApiError::bad_request("Username already exists"));
    }
    if ctx.users.find_by_email(&request.email).await?.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let password_hash = hash_password(&request.password)?;
    ctx.users
        .create_user(&request.username, &request.email, &password_hash, role.as_str())
        .await?;
    info!(username = %request.username, role = %role, "user signed up");

    Ok(Json(json!({
        "message": "Account created successfully! Please login.",
        "status": "success",
    })))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

type SetCookie = AppendHeaders<[(header::HeaderName, String); 1]>;

async fn login(
    State(ctx): State<AppContext>,
    Json(request): Json<LoginRequest>,
) -> Result<(SetCookie, Json<Value>), ApiError> {
    if request.username.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Please enter username and password"));
    }

    let user = ctx
        .users
        .find_by_username(&request.username)
        .await?
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or_else(|| {
            ApiError::new(
                axum::http::StatusCode::UNAUTHORIZED,
                "Invalid username or password",
            )
        })?;

    let token = ctx.sessions.create(&user)?;
    info!(username = %user.username, "user logged in");

    let cookie = format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax");
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({
            "message": "Login successful",
            "username": user.username,
            "role": user.role,
            "status": "success",
        })),
    ))
}

async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> (SetCookie, Json<Value>) {
    if let Some(token) = session_token(&headers) {
        ctx.sessions.remove(&token);
    }
    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; Max-Age=0");
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "message": "You have been logged out", "status": "success" })),
    )
}
