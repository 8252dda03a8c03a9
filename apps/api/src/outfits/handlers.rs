use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::outfit::{Category, Outfit, OutfitAnalysis};
use crate::outfits::upload::{analyze_and_store, read_upload_form};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

impl ListQuery {
    /// Blank and `all` mean no filter; anything else must be a known category.
    fn category(&self) -> Result<Option<Category>, AppError> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(c) if c.eq_ignore_ascii_case("all") => Ok(None),
            Some(c) => c.parse::<Category>().map(Some).map_err(AppError::Validation),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub outfit: Outfit,
    pub analysis: OutfitAnalysis,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OutfitListResponse {
    pub outfits: Vec<Outfit>,
}

#[derive(Debug, Serialize)]
pub struct OutfitResponse {
    pub outfit: Outfit,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Outfit {id} not found"))
}

/// POST /api/outfits/upload
pub async fn handle_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let form = read_upload_form(&mut multipart).await?;
    let outcome = analyze_and_store(&state, auth.id(), form).await?;
    Ok(Json(UploadResponse {
        outfit: outcome.outfit,
        analysis: outcome.analysis,
        message: "Outfit analyzed and saved successfully",
    }))
}

/// GET /api/outfits?category=<category>
pub async fn handle_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<OutfitListResponse>, AppError> {
    let outfits = state.outfits.list(auth.id(), query.category()?).await?;
    Ok(Json(OutfitListResponse { outfits }))
}

/// GET /api/outfits/:id
pub async fn handle_get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OutfitResponse>, AppError> {
    let outfit = state
        .outfits
        .get(auth.id(), id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(OutfitResponse { outfit }))
}

/// PATCH /api/outfits/:id/favorite
pub async fn handle_toggle_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OutfitResponse>, AppError> {
    let outfit = state
        .outfits
        .toggle_favorite(auth.id(), id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(OutfitResponse { outfit }))
}

/// DELETE /api/outfits/:id
///
/// The record goes first; a photo that cannot be released afterwards is
/// logged rather than resurrecting the record.
pub async fn handle_delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let outfit = state
        .outfits
        .delete(auth.id(), id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if let Err(e) = state.images.remove(&outfit.image_ref).await {
        error!("Outfit {id} deleted but its photo was not released: {e}");
    }

    Ok(Json(MessageResponse {
        message: "Outfit deleted successfully",
    }))
}
