//! Dual-strategy text extraction.
//!
//! Cloud OCR is always tried first. When it fails:
//! - PDFs fail immediately; the local engine cannot rasterise them.
//! - Images fall back to the local engine when the bytes are reachable
//!   locally (inline or on disk). A cloud-only URI has no fallback.
//!
//! Every outcome is an [`OcrResult`]; nothing here returns `Err`.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use certscan_core::{DocumentSource, OcrResult, OcrSource, clean_text};
use tracing::{info, warn};

use crate::backend::{CloudInput, CloudOcr, LocalInput, LocalOcr, OcrText};
use crate::error::OcrError;
use crate::normalize::NormalizedSource;

/// Extracted text at or below this many characters counts as a failure.
pub const MIN_TEXT_CHARS: usize = 10;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Confidence assumed when the engine does not report one.
const DEFAULT_CLOUD_CONFIDENCE: f32 = 0.9;
const DEFAULT_LOCAL_CONFIDENCE: f32 = 0.5;

pub struct TextExtractor {
    cloud: Arc<dyn CloudOcr>,
    local: Option<Arc<dyn LocalOcr>>,
    call_timeout: Duration,
}

impl TextExtractor {
    /// Cloud-only extractor with the default call timeout.
    pub fn new(cloud: Arc<dyn CloudOcr>) -> Self {
        Self {
            cloud,
            local: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Enable the local-engine fallback for images.
    pub fn with_local(mut self, local: Arc<dyn LocalOcr>) -> Self {
        self.local = Some(local);
        self
    }

    /// Bound every engine call; a timeout is an ordinary stage failure.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Read the text of `source`. Failures come back as an unsuccessful
    /// [`OcrResult`] whose error says which engines were tried.
    pub async fn extract(&self, source: &NormalizedSource) -> OcrResult {
        let cloud_source = if source.is_pdf() {
            OcrSource::CloudOcrPdf
        } else {
            OcrSource::CloudOcr
        };

        let cloud_error = match self.cloud_text(source).await.and_then(usable) {
            Ok((text, confidence)) => {
                return finish(text, confidence.unwrap_or(DEFAULT_CLOUD_CONFIDENCE), cloud_source);
            }
            Err(e) => e,
        };

        if source.is_pdf() {
            warn!(
                filename = %source.filename(),
                error = %cloud_error,
                "cloud OCR failed for PDF; no fallback"
            );
            return OcrResult::failure(
                cloud_source,
                format!("PDF processing failed: {cloud_error}. Fallback disabled for PDFs."),
            );
        }

        let input = match source.document() {
            DocumentSource::Bytes(data) => LocalInput::Bytes {
                data,
                extension: source.extension(),
            },
            DocumentSource::Path(path) => LocalInput::Path(path),
            DocumentSource::Uri(_) => {
                return OcrResult::failure(
                    cloud_source,
                    format!(
                        "Image OCR failed: {cloud_error}. No local source available for fallback."
                    ),
                );
            }
        };

        let Some(local) = &self.local else {
            return OcrResult::failure(
                cloud_source,
                format!("Image OCR failed: {cloud_error}. Local OCR fallback is not configured."),
            );
        };

        warn!(
            filename = %source.filename(),
            error = %cloud_error,
            "cloud OCR failed; falling back to local OCR"
        );

        let local_result = bounded("local OCR", self.call_timeout, local.recognize(input))
            .await
            .and_then(usable);

        match local_result {
            Ok((text, confidence)) => finish(
                text,
                confidence.unwrap_or(DEFAULT_LOCAL_CONFIDENCE),
                OcrSource::LocalOcr,
            ),
            Err(local_error) => {
                warn!(
                    filename = %source.filename(),
                    error = %local_error,
                    "local OCR failed"
                );
                OcrResult::failure(
                    OcrSource::LocalOcr,
                    format!("Image OCR failed: cloud OCR: {cloud_error}; local OCR: {local_error}"),
                )
            }
        }
    }

    async fn cloud_text(&self, source: &NormalizedSource) -> Result<OcrText, OcrError> {
        let media_type = source.media_type().unwrap_or("application/octet-stream");
        let staged: Vec<u8>;

        let input = match source.document() {
            DocumentSource::Bytes(data) => CloudInput::Bytes { data, media_type },
            DocumentSource::Path(path) => {
                staged = read_local(path).await?;
                CloudInput::Bytes {
                    data: &staged,
                    media_type,
                }
            }
            DocumentSource::Uri(uri) => CloudInput::Uri(uri),
        };

        if source.is_pdf() {
            bounded("cloud PDF OCR", self.call_timeout, self.cloud.document_text(input)).await
        } else {
            bounded("cloud image OCR", self.call_timeout, self.cloud.image_text(input)).await
        }
    }
}

async fn bounded<T>(
    stage: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T, OcrError>>,
) -> Result<T, OcrError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| OcrError::Timeout {
            stage,
            after: limit,
        })?
}

async fn read_local(path: &Path) -> Result<Vec<u8>, OcrError> {
    tokio::fs::read(path).await.map_err(|source| OcrError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Clean engine output and reject near-empty text.
fn usable(raw: OcrText) -> Result<(String, Option<f32>), OcrError> {
    let text = clean_text(&raw.text);
    let chars = text.chars().count();
    if chars <= MIN_TEXT_CHARS {
        return Err(OcrError::InsufficientText(chars));
    }
    Ok((text, raw.confidence))
}

fn finish(text: String, confidence: f32, source: OcrSource) -> OcrResult {
    info!(
        source = %source,
        chars = text.chars().count(),
        confidence,
        "text extracted"
    );
    OcrResult::success(text, confidence, source)
}
