//! Narrow interfaces to the OCR engines.

use std::path::Path;

use async_trait::async_trait;

use crate::error::OcrError;

/// Raw engine output, before cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrText {
    pub text: String,
    /// Engine-reported confidence in [0, 1], when the engine reports one.
    pub confidence: Option<f32>,
}

/// Document handed to the cloud OCR service.
#[derive(Debug, Clone, Copy)]
pub enum CloudInput<'a> {
    Bytes { data: &'a [u8], media_type: &'a str },
    /// An object the service reads itself (`gs://` or `https://`).
    Uri(&'a str),
}

/// Cloud OCR service with separate image and document (PDF) endpoints.
#[async_trait]
pub trait CloudOcr: Send + Sync {
    async fn image_text(&self, input: CloudInput<'_>) -> Result<OcrText, OcrError>;

    async fn document_text(&self, input: CloudInput<'_>) -> Result<OcrText, OcrError>;
}

/// Image handed to the local OCR engine.
#[derive(Debug, Clone, Copy)]
pub enum LocalInput<'a> {
    Bytes { data: &'a [u8], extension: &'a str },
    Path(&'a Path),
}

/// Local OCR engine. Only ever used for images.
#[async_trait]
pub trait LocalOcr: Send + Sync {
    async fn recognize(&self, input: LocalInput<'_>) -> Result<OcrText, OcrError>;
}
