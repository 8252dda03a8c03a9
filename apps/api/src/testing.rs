//! Shared fixtures for unit and router tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use crate::analysis::Analyzer;
use crate::auth::directory::MemoryUserDirectory;
use crate::auth::events::AuthEvents;
use crate::auth::tokens::TokenIssuer;
use crate::auth::Identity;
use crate::images::LocalImageStore;
use crate::llm_client::LlmError;
use crate::models::outfit::{
    Category, NewOutfit, Outfit, OutfitAnalysis, StyleAnalysis, UploadContext,
};
use crate::state::AppState;
use crate::store::MemoryOutfitStore;

pub const VALID_ANALYSIS: &str = r#"{"overallRating":8,"styleScore":7,"colorCoordination":9,"trendAlignment":6,"category":"casual","tags":["minimalist","relaxed"],"feedback":"Clean lines and a calm palette. Consider a bolder accessory."}"#;

/// What a scripted analyzer call does.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail,
    Hang,
}

impl Script {
    async fn run(&self) -> Result<String, LlmError> {
        match self {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail => Err(LlmError::Api {
                status: 503,
                message: "connection reset".to_string(),
            }),
            Script::Hang => std::future::pending().await,
        }
    }
}

/// Analyzer double that answers from a script and counts its calls.
pub struct ScriptedAnalyzer {
    rank: Script,
    describe: Script,
    pub rank_calls: AtomicUsize,
    pub describe_calls: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new(rank: Script) -> Self {
        Self {
            rank,
            describe: Script::Fail,
            rank_calls: AtomicUsize::new(0),
            describe_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_description(mut self, describe: Script) -> Self {
        self.describe = describe;
        self
    }
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn describe_outfit(&self, _image: &[u8], _media_type: &str) -> Result<String, LlmError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.describe.run().await
    }

    async fn rank_outfits(
        &self,
        _system: &str,
        _prompt: &str,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.rank_calls.fetch_add(1, Ordering::SeqCst);
        self.rank.run().await
    }
}

/// An outfit whose `style_score` records its storage position, so tests can
/// read back ordering without comparing ids.
pub fn outfit_with(position: u8, rating: u8, tags: &[&str]) -> Outfit {
    Outfit {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        image_ref: format!("/uploads/{position}.jpg"),
        category: Category::Casual,
        rating,
        style_analysis: StyleAnalysis {
            style_score: position,
            color_coordination: 5,
            trend_alignment: 5,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            feedback: "Fine.".to_string(),
        },
        mood: None,
        occasion: None,
        season: None,
        favorite: false,
        created_at: Utc
            .timestamp_opt(1_700_000_000 - i64::from(position) * 60, 0)
            .unwrap(),
    }
}

/// Outfits in storage order (newest first) with the given ratings.
pub fn rated_outfits(ratings: &[u8]) -> Vec<Outfit> {
    ratings
        .iter()
        .enumerate()
        .map(|(i, &rating)| outfit_with(i as u8, rating, &["classic"]))
        .collect()
}

pub fn new_outfit(user_id: Uuid, category: Category, rating: u8) -> NewOutfit {
    NewOutfit {
        user_id,
        image_ref: format!("/uploads/{}.jpg", Uuid::new_v4().simple()),
        analysis: OutfitAnalysis {
            overall_rating: rating,
            style_score: rating,
            color_coordination: rating,
            trend_alignment: rating,
            category,
            tags: vec!["classic".to_string()],
            feedback: "Well put together.".to_string(),
        },
        context: UploadContext::default(),
    }
}

pub fn test_identity() -> Identity {
    Identity::new(
        Arc::new(MemoryUserDirectory::new()),
        TokenIssuer::new("test-secret", 1),
        AuthEvents::default(),
    )
}

/// In-memory state with photos under a fresh temp dir (`<tmp>/uploads`).
pub fn test_state(analyzer: ScriptedAnalyzer) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState {
        identity: Some(test_identity()),
        outfits: Arc::new(MemoryOutfitStore::new()),
        images: Arc::new(LocalImageStore::new(dir.path().join("uploads"))),
        analyzer: Arc::new(analyzer),
        recommendation_timeout: Duration::from_secs(5),
    };
    (state, dir)
}
