//! Per-request pipeline entities.
//!
//! Everything here is transient: created for one uploaded document and
//! dropped when the analysis is returned.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Type key reported when a document matches no registered category.
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

/// Which extraction strategy produced an [`OcrResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrSource {
    CloudOcr,
    CloudOcrPdf,
    LocalOcr,
}

impl OcrSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CloudOcr => "cloud-ocr",
            Self::CloudOcrPdf => "cloud-ocr-pdf",
            Self::LocalOcr => "local-ocr",
        }
    }
}

impl fmt::Display for OcrSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the text extraction stage.
///
/// Failures are values, not errors: callers check `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub success: bool,
    pub text: String,
    pub confidence: f32,
    /// Strategy that produced the text, or the last one attempted on failure.
    pub source: OcrSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OcrResult {
    pub fn success(text: String, confidence: f32, source: OcrSource) -> Self {
        Self {
            success: true,
            text,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            error: None,
        }
    }

    pub fn failure(source: OcrSource, error: impl Into<String>) -> Self {
        Self {
            success: false,
            text: String::new(),
            confidence: 0.0,
            source,
            error: Some(error.into()),
        }
    }

    /// True when the result carries enough text to be worth classifying.
    pub fn has_usable_text(&self, min_chars: usize) -> bool {
        self.success && self.text.chars().count() >= min_chars
    }
}

/// Output of pass 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub detected_type: String,
    pub confidence: f32,
    pub reason: String,
}

impl ClassificationResult {
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            detected_type: UNKNOWN_TYPE.to_string(),
            confidence: 0.0,
            reason: reason.into(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.detected_type == UNKNOWN_TYPE
    }
}

/// A single extracted value: a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Decimal(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

/// Field name → value, `None` for fields without evidence.
pub type ExtractedFields = BTreeMap<String, Option<FieldValue>>;

/// Output of pass 2, scoped to one certificate type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldExtractionResult {
    /// Every schema field name is a key, even when the model omitted it.
    pub extracted_fields: ExtractedFields,
    /// Present only for non-null fields.
    pub field_confidence: BTreeMap<String, f32>,
    /// Field names the model reported it could not locate.
    pub missing_required: Vec<String>,
}

impl FieldExtractionResult {
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.extracted_fields.get(field).and_then(Option::as_ref)
    }
}

/// The analysis handed back to the upload handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledAnalysis {
    pub is_recognized: bool,
    pub detected_type: String,
    pub type_confidence: f32,
    pub reason: String,
    pub certificate_type: String,
    pub table_name: String,
    pub section_code: String,
    pub extracted: ExtractedFields,
    pub field_confidence: BTreeMap<String, f32>,
    pub overall_confidence: f32,
    pub missing_required: Vec<String>,
}
