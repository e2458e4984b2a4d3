use certscan_ai::{ExtractError, ModelCallError};
use certscan_core::SourceError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid document source: {0}")]
    Source(#[from] SourceError),
    /// OCR produced no usable text. `message` is the extractor's error.
    #[error("text extraction failed: {message}")]
    Extraction { message: String, is_pdf: bool },
    #[error("classification failed: {0}")]
    Classification(#[from] ModelCallError),
    #[error("field extraction failed: {0}")]
    FieldExtraction(#[from] ExtractError),
}

/// User-facing failure, serialized next to successful analyses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub success: bool,
    pub error: String,
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl PipelineError {
    /// Short error shown to the user.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Source(_) => "Invalid upload",
            Self::Extraction { is_pdf: true, .. } => "Could not read text from the PDF",
            Self::Extraction { is_pdf: false, .. } => "Could not read text from the image",
            Self::Classification(_) | Self::FieldExtraction(_) => "Processing failed",
        }
    }

    /// Longer, actionable advice.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Source(_) => {
                "The upload did not contain a readable file. Please select the certificate file again."
            }
            Self::Extraction { is_pdf: true, .. } => {
                "This PDF may be scanned or empty. Try uploading a clear photo or image of the certificate instead."
            }
            Self::Extraction { is_pdf: false, .. } => {
                "The image may be blurry, dark, or too small. Try a clearer, well-lit photo of the whole certificate."
            }
            Self::Classification(_) | Self::FieldExtraction(ExtractError::ModelCall(_)) => {
                "The analysis service is busy or unavailable. Please try again in a few minutes."
            }
            Self::FieldExtraction(_) => {
                "The certificate could not be analysed automatically. Please try again or enter the details manually."
            }
        }
    }

    pub fn report(&self) -> FailureReport {
        FailureReport {
            success: false,
            error: self.summary().to_string(),
            hint: self.hint().to_string(),
            details: Some(self.to_string()),
        }
    }
}
