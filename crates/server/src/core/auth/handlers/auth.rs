//! Auth handlers

use crate::core::auth::{BossInfo, Registration};
use crate::core::config::AppState;
use crate::core::error::Result;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub boss_info: BossInfo,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub password: String,
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Registration>,
) -> Result<(StatusCode, Json<Value>)> {
    info!("POST /api/register");

    let boss = state.auth.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Boss registered successfully",
            "boss_info": boss,
        })),
    ))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    info!("POST /api/login");

    let (boss, session) = state.auth.login(&req.email, &req.password).await?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        access_token: session.token,
        expires_at: session.expires_at,
        boss_info: boss,
    }))
}

/// POST /api/logout
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> Json<Value> {
    info!("POST /api/logout");
    Json(json!({ "message": "Logged out successfully" }))
}

/// POST /api/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>> {
    info!("POST /api/forgot-password");

    state.auth.request_password_reset(&req.email).await?;

    Ok(Json(json!({
        "message": "If the email exists, a reset code has been sent"
    })))
}

/// POST /api/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    info!("POST /api/reset-password");

    state
        .auth
        .reset_password(&req.email, &req.code, &req.password)
        .await?;

    Ok(Json(json!({ "message": "Password reset successfully" })))
}
