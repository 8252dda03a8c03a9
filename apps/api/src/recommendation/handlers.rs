use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::outfit::Outfit;
use crate::recommendation::engine::{recommend, RankingSource, RecommendationRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Outfit>,
    pub source: RankingSource,
}

/// POST /api/outfits/recommendations
///
/// One store read, at most one analyzer call. Analyzer trouble never reaches
/// the client; only a failing store read does.
pub async fn handle_recommendations(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    request.validate()?;

    let outfits = state.outfits.list(auth.id(), None).await?;
    let result = recommend(
        state.analyzer.as_ref(),
        &request,
        outfits,
        state.recommendation_timeout,
    )
    .await;

    info!(
        user_id = %auth.id(),
        source = ?result.source,
        count = result.outfits.len(),
        "Recommendations served"
    );

    Ok(Json(RecommendationResponse {
        recommendations: result.outfits,
        source: result.source,
    }))
}
