//! Normalizer: validates and repairs raw analyzer output into an `OutfitAnalysis`.
//!
//! Parse-or-fail boundary: the result is either a fully valid analysis or an
//! `AnalysisError`. Nothing partial leaves this module, and there is no retry.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm_client::strip_code_fences;
use crate::models::outfit::{Category, OutfitAnalysis};

pub const MAX_TAGS: usize = 5;
const SCORE_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("analyzer output is not a JSON object: {0}")]
    Malformed(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Turns the analyzer's raw text into a validated analysis.
pub fn normalize_analysis(raw: &str) -> Result<OutfitAnalysis, AnalysisError> {
    let text = strip_code_fences(raw);
    let value: Value =
        serde_json::from_str(text).map_err(|e| AnalysisError::Malformed(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| AnalysisError::Malformed(format!("expected object, got {}", kind(&value))))?;

    Ok(OutfitAnalysis {
        overall_rating: score(obj, "overallRating")?,
        style_score: score(obj, "styleScore")?,
        color_coordination: score(obj, "colorCoordination")?,
        trend_alignment: score(obj, "trendAlignment")?,
        category: category(obj)?,
        tags: tags(obj)?,
        feedback: feedback(obj)?,
    })
}

fn required<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, AnalysisError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(AnalysisError::MissingField(field)),
        Some(v) => Ok(v),
    }
}

/// Coerces a number or numeric string, rounds it, and checks the 1-10 range.
fn score(obj: &Map<String, Value>, field: &'static str) -> Result<u8, AnalysisError> {
    let value = required(obj, field)?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
    .ok_or_else(|| AnalysisError::InvalidField {
        field,
        reason: format!("expected a number, got {}", kind(value)),
    })?;

    let rounded = number.round() as i64;
    if !SCORE_RANGE.contains(&rounded) {
        return Err(AnalysisError::InvalidField {
            field,
            reason: format!("{number} is outside 1-10"),
        });
    }
    Ok(rounded as u8)
}

fn category(obj: &Map<String, Value>) -> Result<Category, AnalysisError> {
    let value = required(obj, "category")?;
    value
        .as_str()
        .ok_or_else(|| AnalysisError::InvalidField {
            field: "category",
            reason: format!("expected a string, got {}", kind(value)),
        })?
        .parse::<Category>()
        .map_err(|reason| AnalysisError::InvalidField {
            field: "category",
            reason,
        })
}

fn tags(obj: &Map<String, Value>) -> Result<Vec<String>, AnalysisError> {
    let value = required(obj, "tags")?;
    let items = value.as_array().ok_or_else(|| AnalysisError::InvalidField {
        field: "tags",
        reason: format!("expected an array, got {}", kind(value)),
    })?;

    let mut tags = Vec::with_capacity(MAX_TAGS);
    for item in items {
        let tag = item.as_str().ok_or_else(|| AnalysisError::InvalidField {
            field: "tags",
            reason: format!("expected strings, got {}", kind(item)),
        })?;
        let tag = tag.trim();
        if !tag.is_empty() {
            tags.push(tag.to_string());
        }
    }
    tags.truncate(MAX_TAGS);
    Ok(tags)
}

fn feedback(obj: &Map<String, Value>) -> Result<String, AnalysisError> {
    let value = required(obj, "feedback")?;
    match value.as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        Some(_) => Err(AnalysisError::InvalidField {
            field: "feedback",
            reason: "must not be empty".to_string(),
        }),
        None => Err(AnalysisError::InvalidField {
            field: "feedback",
            reason: format!("expected a string, got {}", kind(value)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
