//! Decoding of model answers into typed replies.
//!
//! Models sometimes wrap JSON in Markdown fences or add a sentence around
//! it. Fences are stripped, then the outermost `{...}` span is tried if the
//! whole answer does not decode. Shape is enforced by the serde types: a
//! wrong value type is a parse failure, not a silent default.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("model answer contains no JSON object")]
    NoJson,
    #[error("model answer has the wrong shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Pass 1 answer.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClassification {
    pub detected_type: Option<String>,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Pass 2 answer. Field values stay loosely typed until post-processing.
#[derive(Debug, Deserialize)]
pub(crate) struct RawExtraction {
    pub extracted_fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub field_confidence: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub missing_required: Vec<String>,
}

pub(crate) fn parse_model_json<T: DeserializeOwned>(answer: &str) -> Result<T, ParseError> {
    let stripped = strip_code_fences(answer);
    match serde_json::from_str(stripped) {
        Ok(value) => Ok(value),
        Err(err) => match outer_object(stripped) {
            Some(span) if span.len() < stripped.len() => Ok(serde_json::from_str(span)?),
            Some(_) => Err(err.into()),
            None => Err(ParseError::NoJson),
        },
    }
}

/// "```json\n{...}\n```" → "{...}".
fn strip_code_fences(answer: &str) -> &str {
    let trimmed = answer.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
