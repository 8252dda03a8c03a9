//! Outfit analysis: the `Analyzer` seam over the multimodal model, plus the
//! normalizer that turns its untrusted output into an `OutfitAnalysis`.

use async_trait::async_trait;

use crate::llm_client::{ContentPart, LlmClient, LlmError, LlmRequest};

pub mod normalizer;
pub mod prompts;

use prompts::{OUTFIT_ANALYSIS_MAX_TOKENS, OUTFIT_ANALYSIS_PROMPT, OUTFIT_ANALYSIS_SYSTEM};

/// Model calls made by the wardrobe service. Both return raw, unvalidated text.
///
/// Carried in `AppState` as `Arc<dyn Analyzer>` so tests can script responses.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Judges one outfit photo. The answer should be the JSON object described
    /// in `OUTFIT_ANALYSIS_PROMPT`, but callers must not trust that.
    async fn describe_outfit(&self, image: &[u8], media_type: &str) -> Result<String, LlmError>;

    /// Ranks already-analyzed outfits from a text-only prompt. Single attempt.
    async fn rank_outfits(&self, system: &str, prompt: &str, max_tokens: u32)
        -> Result<String, LlmError>;
}

#[async_trait]
impl Analyzer for LlmClient {
    async fn describe_outfit(&self, image: &[u8], media_type: &str) -> Result<String, LlmError> {
        let content = [
            ContentPart::text(OUTFIT_ANALYSIS_PROMPT),
            ContentPart::image(image, media_type),
        ];
        self.call_text(&LlmRequest {
            system: Some(OUTFIT_ANALYSIS_SYSTEM),
            content: &content,
            max_tokens: OUTFIT_ANALYSIS_MAX_TOKENS,
        })
        .await
    }

    async fn rank_outfits(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let content = [ContentPart::text(prompt)];
        let response = self
            .call_once(&LlmRequest {
                system: Some(system),
                content: &content,
                max_tokens,
            })
            .await?;
        // An empty answer is a valid (weak) signal for ranking, not an error.
        Ok(response.text().unwrap_or_default().to_string())
    }
}
