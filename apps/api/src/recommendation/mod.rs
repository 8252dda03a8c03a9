// Outfit recommendation: AI ranking over a user's wardrobe with a
// deterministic fallback when the ranking call fails.

pub mod engine;
pub mod handlers;
pub mod prompts;
