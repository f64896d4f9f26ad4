//! Profile API endpoints for the authenticated user.

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::errors::{AppError, FieldError};
use crate::models::{UpdateProfileRequest, UserProfile};
use crate::AppState;

/// Response body for profile updates: a fresh access token reflecting the
/// updated identity.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// GET /api/profile - Get the caller's profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> ApiResult<Json<UserProfile>> {
    match state.repo.get_user(current_user.id).await? {
        Some(user) => Ok(Json(UserProfile::from(&user))),
        None => Err(AppError::NotFound("Profile not found".to_string())),
    }
}

/// PUT /api/profile - Update the caller's username and/or email.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let mut errors = Vec::new();
    if let Some(username) = &request.username {
        if username.trim().is_empty() {
            errors.push(FieldError::new("username", "must not be blank"));
        }
    }
    if let Some(email) = &request.email {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') || email.contains(char::is_whitespace) {
            errors.push(FieldError::new("email", "must be a valid email address"));
        }
        if state
            .repo
            .find_user_by_email(email)
            .await?
            .is_some_and(|u| u.id != current_user.id)
        {
            errors.push(FieldError::new("email", "is already registered"));
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let updated = state
        .repo
        .update_user_profile(
            current_user.id,
            request.username.as_deref().map(str::trim),
            request.email.as_deref().map(str::trim),
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    tracing::info!(user_id = updated.id, "Updated profile");
    let token = state.tokens.generate_access_token(updated.id)?;
    Ok(Json(TokenResponse { token }))
}
