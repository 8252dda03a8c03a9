pub const RANKING_SYSTEM: &str = crate::llm_client::prompts::LIST_ONLY_SYSTEM;

/// Ranking request for one context. Values are inserted once and never
/// rescanned, so user text that looks like a placeholder stays literal.
pub fn ranking_prompt(
    mood: &str,
    occasion: &str,
    weather: &str,
    outfits: &str,
    count: usize,
) -> String {
    format!(
        "Based on the following context, recommend the best 3 outfits from the user's wardrobe.

Context:
- Mood: {mood}
- Occasion: {occasion}
- Weather: {weather}

Available outfits:
{outfits}

Respond with just the outfit numbers (1-{count}) in order of recommendation, separated by commas."
    )
}

/// The answer is a handful of digits and commas.
pub const RANKING_MAX_TOKENS: u32 = 50;
