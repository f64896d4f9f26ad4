//! Authentication API endpoints: registration, login, token refresh.

use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::ApiResult;
use crate::auth::{hash_password, verify_password};
use crate::errors::{AppError, FieldError};
use crate::models::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Response body for registration.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/auth/register - Register a new user.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let mut errors = Vec::new();
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') || email.contains(char::is_whitespace) {
        errors.push(FieldError::new("email", "must be a valid email address"));
    }
    if request.password.chars().count() < 8 {
        errors.push(FieldError::new("password", "must be at least 8 characters"));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if state.repo.find_user_by_email(email).await?.is_some() {
        return Err(AppError::validation("email", "is already registered"));
    }

    // Default the username to the local part of the email
    let username = match &request.username {
        Some(username) if !username.trim().is_empty() => username.trim().to_string(),
        _ => email.split('@').next().unwrap_or(email).to_string(),
    };

    let password_hash = hash_password(&request.password)?;
    let user = state.repo.create_user(email, &username, &password_hash).await?;
    tracing::info!(user_id = user.id, "Registered new user");

    Ok(Json(MessageResponse {
        message: "User registered successfully".to_string(),
    }))
}

/// POST /api/auth/login - Authenticate and issue a token pair.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    // Unknown email and wrong password answer identically
    let Some(user) = state.repo.find_user_by_email(request.email.trim()).await? else {
        tracing::warn!("Login failed: unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&request.password, &user.password_hash) {
        tracing::warn!(user_id = user.id, "Login failed: wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let response = issue_token_pair(&state, user.id).await?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(response))
}

/// POST /api/auth/refresh - Rotate a refresh token into a fresh pair.
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    if request.refresh_token.trim().is_empty() {
        return Err(AppError::validation("refreshToken", "is required"));
    }

    let Some(stored) = state.repo.find_refresh_token(&request.refresh_token).await? else {
        tracing::warn!("Refresh failed: unknown token");
        return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
    };

    let expired = DateTime::parse_from_rfc3339(&stored.expires_at)
        .map(|exp| exp < Utc::now())
        .unwrap_or(true);
    if stored.revoked || expired {
        tracing::warn!(user_id = stored.user_id, "Refresh failed: revoked or expired token");
        return Err(AppError::Unauthorized(
            "Refresh token is invalid or expired".to_string(),
        ));
    }

    // Rotate: the old token is dead as soon as the new pair exists
    state.repo.revoke_refresh_token(stored.id).await?;
    let response = issue_token_pair(&state, stored.user_id).await?;
    tracing::info!(user_id = stored.user_id, "Refreshed token pair");
    Ok(Json(response))
}

/// Issue an access token plus a stored, rotating refresh token.
async fn issue_token_pair(state: &AppState, user_id: i64) -> Result<AuthResponse, AppError> {
    let token = state.tokens.generate_access_token(user_id)?;

    let refresh_token = Uuid::new_v4().to_string();
    let expires_at =
        (Utc::now() + Duration::seconds(state.config.refresh_token_ttl_secs)).to_rfc3339();
    state
        .repo
        .insert_refresh_token(user_id, &refresh_token, &expires_at)
        .await?;

    Ok(AuthResponse {
        token,
        refresh_token,
    })
}
