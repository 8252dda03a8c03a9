use std::sync::Arc;
use std::time::Duration;

use crate::analysis::Analyzer;
use crate::auth::Identity;
use crate::errors::AppError;
use crate::images::ImageStore;
use crate::store::OutfitStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// `None` when `JWT_SECRET` is unset; auth and owner-scoped routes answer 503.
    pub identity: Option<Identity>,
    pub outfits: Arc<dyn OutfitStore>,
    pub images: Arc<dyn ImageStore>,
    /// Multimodal model behind a trait so tests can script its answers.
    pub analyzer: Arc<dyn Analyzer>,
    /// Upper bound on the single ranking call per recommendation request.
    pub recommendation_timeout: Duration,
}

impl AppState {
    pub fn identity(&self) -> Result<&Identity, AppError> {
        self.identity.as_ref().ok_or_else(|| {
            AppError::Configuration(
                "Identity provider not configured. Set JWT_SECRET to enable sign-in.".to_string(),
            )
        })
    }
}
