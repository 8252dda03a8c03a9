use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Casual,
    Formal,
    Street,
    Party,
    Business,
    Athletic,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Casual,
        Category::Formal,
        Category::Street,
        Category::Party,
        Category::Business,
        Category::Athletic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Casual => "casual",
            Category::Formal => "formal",
            Category::Street => "street",
            Category::Party => "party",
            Category::Business => "business",
            Category::Athletic => "athletic",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Case-insensitive, surrounding whitespace ignored. No aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown category '{needle}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" | "autumn" => Ok(Season::Fall),
            "winter" => Ok(Season::Winter),
            other => Err(format!("unknown season '{other}'")),
        }
    }
}

/// Sub-scores and commentary produced by the analyzer for one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleAnalysis {
    pub style_score: u8,
    pub color_coordination: u8,
    pub trend_alignment: u8,
    pub tags: Vec<String>,
    pub feedback: String,
}

/// A validated analyzer judgment. Only the normalizer constructs these from
/// model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitAnalysis {
    pub overall_rating: u8,
    pub style_score: u8,
    pub color_coordination: u8,
    pub trend_alignment: u8,
    pub category: Category,
    pub tags: Vec<String>,
    pub feedback: String,
}

impl OutfitAnalysis {
    pub fn style_analysis(&self) -> StyleAnalysis {
        StyleAnalysis {
            style_score: self.style_score,
            color_coordination: self.color_coordination,
            trend_alignment: self.trend_alignment,
            tags: self.tags.clone(),
            feedback: self.feedback.clone(),
        }
    }
}

/// Context the user attaches at upload time. Immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadContext {
    pub mood: Option<String>,
    pub occasion: Option<String>,
    pub season: Option<Season>,
}

/// Everything needed to persist a freshly analyzed outfit.
#[derive(Debug, Clone)]
pub struct NewOutfit {
    pub user_id: Uuid,
    pub image_ref: String,
    pub analysis: OutfitAnalysis,
    pub context: UploadContext,
}

/// One analyzed outfit belonging to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outfit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_ref: String,
    pub category: Category,
    pub rating: u8,
    pub style_analysis: StyleAnalysis,
    pub mood: Option<String>,
    pub occasion: Option<String>,
    pub season: Option<Season>,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
}

impl Outfit {
    /// Builds the record for a new outfit. `favorite` always starts false.
    pub fn create(new: NewOutfit, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            image_ref: new.image_ref,
            category: new.analysis.category,
            rating: new.analysis.overall_rating,
            style_analysis: new.analysis.style_analysis(),
            mood: new.context.mood,
            occasion: new.context.occasion,
            season: new.context.season,
            favorite: false,
            created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OutfitRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_ref: String,
    pub category: String,
    pub rating: i16,
    pub style_analysis: Json<StyleAnalysis>,
    pub mood: Option<String>,
    pub occasion: Option<String>,
    pub season: Option<String>,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OutfitRow> for Outfit {
    type Error = anyhow::Error;

    fn try_from(row: OutfitRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse::<Category>()
            .map_err(|e| anyhow!("outfit {}: {e}", row.id))?;
        let season = row
            .season
            .as_deref()
            .map(Season::from_str)
            .transpose()
            .map_err(|e| anyhow!("outfit {}: {e}", row.id))?;
        let rating = u8::try_from(row.rating)
            .map_err(|_| anyhow!("outfit {}: rating {} out of range", row.id, row.rating))?;

        Ok(Outfit {
            id: row.id,
            user_id: row.user_id,
            image_ref: row.image_ref,
            category,
            rating,
            style_analysis: row.style_analysis.0,
            mood: row.mood,
            occasion: row.occasion,
            season,
            favorite: row.favorite,
            created_at: row.created_at,
        })
    }
}
