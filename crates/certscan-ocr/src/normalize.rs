//! Source normalisation: decide how a request's document will be read.
//!
//! Pure data transformation; nothing here touches the filesystem or network.

use std::path::Path;

use certscan_core::{DocumentSource, ExtractionRequest, SourceError};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Declared types that carry no information about the content.
const OPAQUE_MEDIA_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

const CLOUD_URI_SCHEMES: &[&str] = &["gs://", "https://", "http://"];

/// A request resolved for the text extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSource {
    document: DocumentSource,
    media_type: Option<String>,
    is_pdf: bool,
    filename: String,
}

impl NormalizedSource {
    pub fn document(&self) -> &DocumentSource {
        &self.document
    }

    pub fn is_pdf(&self) -> bool {
        self.is_pdf
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// File extension suitable for staging the bytes on disk.
    pub fn extension(&self) -> &str {
        extension_of(&self.filename)
            .or_else(|| self.media_type().and_then(extension_for_media_type))
            .unwrap_or("img")
    }
}

/// Resolve media type and PDF-ness for a request.
///
/// The declared media type wins; otherwise the type is inferred from the
/// original filename, then from the path or URI itself.
pub fn normalize(request: ExtractionRequest) -> Result<NormalizedSource, SourceError> {
    match &request.source {
        DocumentSource::Bytes(bytes) if bytes.is_empty() => return Err(SourceError::EmptyBytes),
        DocumentSource::Uri(uri) if !has_cloud_scheme(uri) => {
            return Err(SourceError::UnsupportedUri(uri.clone()));
        }
        _ => {}
    }

    let declared = request
        .declared_media_type
        .as_deref()
        .map(essence)
        .filter(|m| !m.is_empty() && !OPAQUE_MEDIA_TYPES.contains(&m.as_str()));

    let media_type = declared.or_else(|| {
        extension_of(&request.original_filename)
            .or_else(|| source_extension(&request.source))
            .and_then(media_type_for_extension)
            .map(str::to_string)
    });

    let is_pdf = media_type.as_deref() == Some(PDF_MEDIA_TYPE);

    tracing::debug!(
        source = request.source.kind(),
        filename = %request.original_filename,
        media_type = media_type.as_deref().unwrap_or("unknown"),
        is_pdf,
        "normalized extraction source"
    );

    Ok(NormalizedSource {
        document: request.source,
        media_type,
        is_pdf,
        filename: request.original_filename,
    })
}

/// Lowercased media type without parameters: "Application/PDF; q=1" → "application/pdf".
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn has_cloud_scheme(uri: &str) -> bool {
    let lower = uri.trim().to_ascii_lowercase();
    CLOUD_URI_SCHEMES.iter().any(|s| lower.starts_with(s))
}

fn extension_of(name: &str) -> Option<&str> {
    // Ignore query strings and fragments on URIs.
    let name = name.split(['?', '#']).next().unwrap_or(name);
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
}

fn source_extension(source: &DocumentSource) -> Option<&str> {
    match source {
        DocumentSource::Bytes(_) => None,
        DocumentSource::Path(path) => path.extension().and_then(|e| e.to_str()),
        DocumentSource::Uri(uri) => extension_of(uri),
    }
}

pub fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some(PDF_MEDIA_TYPE),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn extension_for_media_type(media_type: &str) -> Option<&'static str> {
    match media_type {
        PDF_MEDIA_TYPE => Some("pdf"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
