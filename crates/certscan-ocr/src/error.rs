use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} timed out after {}s", .after.as_secs_f32())]
    Timeout {
        stage: &'static str,
        after: Duration,
    },

    #[error("OCR service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("OCR service returned no text")]
    EmptyResponse,

    #[error("OCR produced only {0} characters of usable text")]
    InsufficientText(usize),

    #[error("unsupported OCR input: {0}")]
    Unsupported(String),

    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[cfg(feature = "vision")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "vision")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
