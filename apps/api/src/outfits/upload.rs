//! Upload pipeline: store photo → analyze → normalize → persist.
//!
//! Once the photo is stored, any later failure removes it again before the
//! error propagates. A record is only written after analysis fully succeeds.

use axum::extract::Multipart;
use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::normalizer::normalize_analysis;
use crate::errors::AppError;
use crate::images::supported_media_type;
use crate::models::outfit::{NewOutfit, Outfit, OutfitAnalysis, Season, UploadContext};
use crate::state::AppState;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Transport cap for the whole multipart body: the image plus a few text fields.
pub const MAX_UPLOAD_BODY_BYTES: usize = MAX_IMAGE_BYTES + 1024 * 1024;
const MAX_CONTEXT_LEN: usize = 200;

#[derive(Debug)]
pub struct UploadForm {
    pub image: Bytes,
    pub content_type: String,
    pub context: UploadContext,
}

#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub outfit: Outfit,
    pub analysis: OutfitAnalysis,
}

/// Reads the `image` file and the optional `mood`, `occasion`, `season` fields.
pub async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, AppError> {
    let mut image: Option<(Bytes, String)> = None;
    let mut context = UploadContext::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let content_type = field
                    .content_type()
                    .and_then(supported_media_type)
                    .ok_or_else(|| {
                        AppError::Validation(
                            "Only JPEG, PNG, GIF or WebP images are allowed".to_string(),
                        )
                    })?
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read image: {e}")))?;
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(AppError::Validation(
                        "Image exceeds the 10 MiB limit".to_string(),
                    ));
                }
                image = Some((bytes, content_type));
            }
            "mood" | "occasion" | "season" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid field {name}: {e}")))?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if text.chars().count() > MAX_CONTEXT_LEN {
                    return Err(AppError::Validation(format!(
                        "{name} must be at most {MAX_CONTEXT_LEN} characters"
                    )));
                }
                match name.as_str() {
                    "mood" => context.mood = Some(text.to_string()),
                    "occasion" => context.occasion = Some(text.to_string()),
                    _ => context.season = Some(text.parse::<Season>().map_err(AppError::Validation)?),
                }
            }
            _ => {}
        }
    }

    let (image, content_type) = image
        .filter(|(bytes, _)| !bytes.is_empty())
        .ok_or_else(|| AppError::Validation("No image file provided".to_string()))?;

    Ok(UploadForm {
        image,
        content_type,
        context,
    })
}

/// Runs the full pipeline for one upload. No partial state survives a failure.
pub async fn analyze_and_store(
    state: &AppState,
    user_id: Uuid,
    form: UploadForm,
) -> Result<UploadOutcome, AppError> {
    let image_ref = state
        .images
        .put(user_id, form.image.clone(), &form.content_type)
        .await?;

    match analyze_and_persist(state, user_id, &image_ref, form).await {
        Ok(outcome) => {
            info!(
                outfit_id = %outcome.outfit.id,
                rating = outcome.outfit.rating,
                category = %outcome.outfit.category,
                "Outfit analyzed and saved"
            );
            Ok(outcome)
        }
        Err(e) => {
            if let Err(cleanup) = state.images.remove(&image_ref).await {
                error!("Failed to release photo {image_ref} after upload failure: {cleanup}");
            }
            Err(e)
        }
    }
}

async fn analyze_and_persist(
    state: &AppState,
    user_id: Uuid,
    image_ref: &str,
    form: UploadForm,
) -> Result<UploadOutcome, AppError> {
    let raw = state
        .analyzer
        .describe_outfit(&form.image, &form.content_type)
        .await
        .map_err(|e| AppError::AnalysisFailed(e.to_string()))?;

    let analysis =
        normalize_analysis(&raw).map_err(|e| AppError::AnalysisFailed(e.to_string()))?;

    let outfit = state
        .outfits
        .insert(NewOutfit {
            user_id,
            image_ref: image_ref.to_string(),
            analysis: analysis.clone(),
            context: form.context,
        })
        .await?;

    Ok(UploadOutcome { outfit, analysis })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::models::outfit::Category;
    use crate::testing::{test_state, Script, ScriptedAnalyzer, VALID_ANALYSIS};

    fn form() -> UploadForm {
        UploadForm {
            image: Bytes::from_static(b"\x89PNG fake"),
            content_type: "image/png".to_string(),
            context: UploadContext {
                mood: Some("Relaxed".into()),
                occasion: None,
                season: Some(Season::Summer),
            },
        }
    }

    fn uploaded_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_successful_upload_persists_record() {
        let analyzer = ScriptedAnalyzer::new(Script::Fail)
            .with_description(Script::Reply(format!("```json\n{VALID_ANALYSIS}\n```")));
        let (state, dir) = test_state(analyzer);
        let user = Uuid::new_v4();

        let outcome = analyze_and_store(&state, user, form()).await.unwrap();
        assert_eq!(outcome.outfit.rating, 8);
        assert_eq!(outcome.outfit.category, Category::Casual);
        assert_eq!(outcome.outfit.season, Some(Season::Summer));
        assert!(!outcome.outfit.favorite);
        assert_eq!(outcome.outfit.style_analysis, outcome.analysis.style_analysis());
        assert_eq!(uploaded_files(&dir.path().join("uploads")), 1);
    }

    #[tokio::test]
    async fn test_analyzer_failure_removes_photo_and_writes_nothing() {
        let analyzer = ScriptedAnalyzer::new(Script::Fail).with_description(Script::Fail);
        let (state, dir) = test_state(analyzer);
        let user = Uuid::new_v4();

        let err = analyze_and_store(&state, user, form()).await.unwrap_err();
        assert!(matches!(err, AppError::AnalysisFailed(_)));
        assert_eq!(uploaded_files(&dir.path().join("uploads")), 0);
        assert!(state.outfits.list(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_analysis_removes_photo_and_writes_nothing() {
        let bad = VALID_ANALYSIS.replace("\"casual\"", "\"gala\"");
        let analyzer = ScriptedAnalyzer::new(Script::Fail).with_description(Script::Reply(bad));
        let (state, dir) = test_state(analyzer);
        let user = Uuid::new_v4();

        let err = analyze_and_store(&state, user, form()).await.unwrap_err();
        assert!(matches!(err, AppError::AnalysisFailed(_)));
        assert_eq!(uploaded_files(&dir.path().join("uploads")), 0);
        assert!(state.outfits.list(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analysis_is_called_once_per_upload() {
        let analyzer = std::sync::Arc::new(
            ScriptedAnalyzer::new(Script::Fail)
                .with_description(Script::Reply(VALID_ANALYSIS.to_string())),
        );
        let (mut state, _dir) = test_state(ScriptedAnalyzer::new(Script::Fail));
        state.analyzer = analyzer.clone();

        analyze_and_store(&state, Uuid::new_v4(), form()).await.unwrap();
        assert_eq!(analyzer.describe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(analyzer.rank_calls.load(Ordering::SeqCst), 0);
    }
}
