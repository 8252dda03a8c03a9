/// System prompt for per-photo outfit analysis.
pub const OUTFIT_ANALYSIS_SYSTEM: &str = crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// Instruction sent alongside the photo.
pub const OUTFIT_ANALYSIS_PROMPT: &str = r#"Analyze this outfit photo as a professional fashion consultant. Rate the outfit on a scale of 1-10 and provide:
1. Overall rating (1-10)
2. Style score (1-10)
3. Color coordination (1-10)
4. Trend alignment (1-10)
5. Category: exactly one of casual, formal, street, party, business, athletic
6. Style tags: at most 5 short tags such as "minimalist", "bohemian", "edgy"
7. Constructive feedback: 2-3 sentences

Respond with this JSON object:
{
  "overallRating": number,
  "styleScore": number,
  "colorCoordination": number,
  "trendAlignment": number,
  "category": string,
  "tags": string[],
  "feedback": string
}"#;

pub const OUTFIT_ANALYSIS_MAX_TOKENS: u32 = 500;
