//! Composition API endpoints.
//!
//! Every operation is scoped to the authenticated caller; a composition
//! that is absent and one owned by someone else both answer 404.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::export;
use crate::models::{Composition, CompositionDraft};
use crate::AppState;

/// GET /api/compositions - List the caller's compositions.
pub async fn list_compositions(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Composition>>> {
    tracing::info!(owner_id = current_user.id, "Listing compositions");
    let compositions = state.repo.list_compositions(current_user.id).await?;
    Ok(Json(compositions))
}

/// GET /api/compositions/:id - Get a single composition.
pub async fn get_composition(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Composition>> {
    match state.repo.get_composition(current_user.id, id).await? {
        Some(composition) => Ok(Json(composition)),
        None => {
            tracing::warn!(owner_id = current_user.id, id, "Composition not found");
            Err(AppError::NotFound(format!("Composition {} not found", id)))
        }
    }
}

/// POST /api/compositions - Create a new composition.
pub async fn create_composition(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(draft): Json<CompositionDraft>,
) -> ApiResult<(StatusCode, Json<Composition>)> {
    draft.validate().map_err(AppError::Validation)?;

    tracing::info!(owner_id = current_user.id, "Creating composition");
    let composition = state.repo.create_composition(current_user.id, &draft).await?;
    tracing::info!(
        owner_id = current_user.id,
        id = composition.id,
        "Created composition"
    );
    Ok((StatusCode::CREATED, Json(composition)))
}

/// PUT /api/compositions/:id - Replace a composition wholesale.
pub async fn update_composition(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(draft): Json<CompositionDraft>,
) -> ApiResult<StatusCode> {
    draft.validate().map_err(AppError::Validation)?;

    tracing::info!(owner_id = current_user.id, id, "Updating composition");
    match state
        .repo
        .update_composition(current_user.id, id, &draft)
        .await?
    {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => {
            tracing::warn!(owner_id = current_user.id, id, "Composition not found for update");
            Err(AppError::NotFound(format!("Composition {} not found", id)))
        }
    }
}

/// DELETE /api/compositions/:id - Delete a composition and its players.
pub async fn delete_composition(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    tracing::info!(owner_id = current_user.id, id, "Deleting composition");
    if state.repo.delete_composition(current_user.id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        tracing::warn!(owner_id = current_user.id, id, "Composition not found for deletion");
        Err(AppError::NotFound(format!("Composition {} not found", id)))
    }
}

/// GET /api/compositions/:id/export - Download the composition as a PDF.
pub async fn export_composition(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(composition) = state.repo.get_composition(current_user.id, id).await? else {
        tracing::warn!(owner_id = current_user.id, id, "Composition not found for export");
        return Err(AppError::NotFound(format!("Composition {} not found", id)));
    };

    let bytes = export::render_pdf(&composition, Utc::now())?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::export_filename(&composition.name)
    );
    tracing::info!(
        owner_id = current_user.id,
        id,
        size = bytes.len(),
        "Exported composition"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
