//! Inbound extraction requests.
//!
//! The upload handler speaks a JSON shape with three optional source fields.
//! That shape is converted once into [`DocumentSource`], which makes "exactly
//! one source" a type-level fact for the rest of the pipeline.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("extraction request has no source (expected one of inlineBytes, localPath, cloudUri)")]
    Missing,

    #[error("extraction request has {0} sources populated (expected exactly one)")]
    Ambiguous(usize),

    #[error("inline bytes are empty")]
    EmptyBytes,

    #[error("inline bytes are not valid base64: {0}")]
    InvalidBase64(String),

    #[error("unsupported cloud URI {0:?} (expected gs://, https:// or http://)")]
    UnsupportedUri(String),
}

/// Where the uploaded document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
    /// A `gs://` or `http(s)://` object the cloud OCR service can read itself.
    Uri(String),
}

impl DocumentSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Path(_) => "path",
            Self::Uri(_) => "uri",
        }
    }
}

/// One unit of work for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub source: DocumentSource,
    pub declared_media_type: Option<String>,
    pub original_filename: String,
}

impl ExtractionRequest {
    pub fn new(source: DocumentSource, original_filename: impl Into<String>) -> Self {
        Self {
            source,
            declared_media_type: None,
            original_filename: original_filename.into(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.declared_media_type = Some(media_type.into());
        self
    }
}

/// Source block as sent by the upload handler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSource {
    /// Base64-encoded file content.
    pub inline_bytes: Option<String>,
    pub local_path: Option<PathBuf>,
    pub cloud_uri: Option<String>,
}

/// Extraction request as sent by the upload handler.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireExtractionRequest {
    pub source: WireSource,
    pub declared_media_type: Option<String>,
    pub original_filename: String,
}

impl TryFrom<WireSource> for DocumentSource {
    type Error = SourceError;

    fn try_from(wire: WireSource) -> Result<Self, Self::Error> {
        let populated = [
            wire.inline_bytes.is_some(),
            wire.local_path.is_some(),
            wire.cloud_uri.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        match populated {
            0 => return Err(SourceError::Missing),
            1 => {}
            n => return Err(SourceError::Ambiguous(n)),
        }

        if let Some(encoded) = wire.inline_bytes {
            let bytes = BASE64_STANDARD
                .decode(encoded.trim())
                .map_err(|e| SourceError::InvalidBase64(e.to_string()))?;
            return Ok(Self::Bytes(bytes));
        }
        if let Some(path) = wire.local_path {
            return Ok(Self::Path(path));
        }
        match wire.cloud_uri {
            Some(uri) => Ok(Self::Uri(uri)),
            None => Err(SourceError::Missing),
        }
    }
}

impl TryFrom<WireExtractionRequest> for ExtractionRequest {
    type Error = SourceError;

    fn try_from(wire: WireExtractionRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            source: DocumentSource::try_from(wire.source)?,
            declared_media_type: wire
                .declared_media_type
                .filter(|m| !m.trim().is_empty()),
            original_filename: wire.original_filename,
        })
    }
}
