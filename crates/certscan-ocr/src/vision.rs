//! Google Cloud Vision REST client for the cloud OCR stage.
//!
//! Images go through `images:annotate`, PDFs through `files:annotate`; both
//! request `DOCUMENT_TEXT_DETECTION`, which handles dense certificate layouts
//! better than plain `TEXT_DETECTION`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::backend::{CloudInput, CloudOcr, OcrText};
use crate::error::OcrError;
use crate::normalize::PDF_MEDIA_TYPE;

pub const DEFAULT_BASE_URL: &str = "https://vision.googleapis.com/v1";

/// `files:annotate` only accepts up to five pages per synchronous request.
const PDF_PAGE_LIMIT: u32 = 5;

const FEATURE: &str = "DOCUMENT_TEXT_DETECTION";

#[derive(Debug, Clone)]
pub enum VisionAuth {
    ApiKey(String),
    Bearer(String),
}

pub struct VisionClient {
    client: reqwest::Client,
    base_url: String,
    auth: VisionAuth,
}

#[derive(Deserialize)]
struct BatchAnnotateImagesResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize)]
struct BatchAnnotateFilesResponse {
    #[serde(default)]
    responses: Vec<AnnotateFileResponse>,
}

#[derive(Deserialize)]
struct AnnotateFileResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
    error: Option<Status>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    confidence: Option<f32>,
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl VisionClient {
    /// Client for the public `vision.googleapis.com` endpoint.
    pub fn new(auth: VisionAuth) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            auth,
        }
    }

    /// Point the client at a different endpoint (regional or emulator).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn post<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, OcrError> {
        let url = format!("{}/{}", self.base_url, method);
        let request = match &self.auth {
            VisionAuth::ApiKey(key) => self.client.post(&url).query(&[("key", key)]),
            VisionAuth::Bearer(token) => self.client.post(&url).bearer_auth(token),
        };

        debug!(url = %url, "calling Cloud Vision");
        let resp = request.json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Service {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CloudOcr for VisionClient {
    async fn image_text(&self, input: CloudInput<'_>) -> Result<OcrText, OcrError> {
        let body = json!({ "requests": [image_request(input)] });
        let batch: BatchAnnotateImagesResponse = self.post("images:annotate", &body).await?;
        collect_text(batch.responses)
    }

    async fn document_text(&self, input: CloudInput<'_>) -> Result<OcrText, OcrError> {
        let request = file_request(input)?;
        let body = json!({ "requests": [request] });
        let batch: BatchAnnotateFilesResponse = self.post("files:annotate", &body).await?;

        let mut pages = Vec::new();
        for file in batch.responses {
            if let Some(err) = file.error {
                return Err(status_error(err));
            }
            pages.extend(file.responses);
        }
        collect_text(pages)
    }
}

fn image_request(input: CloudInput<'_>) -> Value {
    let image = match input {
        CloudInput::Bytes { data, .. } => json!({ "content": BASE64_STANDARD.encode(data) }),
        CloudInput::Uri(uri) => json!({ "source": { "imageUri": uri } }),
    };
    json!({
        "image": image,
        "features": [{ "type": FEATURE }],
    })
}

fn file_request(input: CloudInput<'_>) -> Result<Value, OcrError> {
    let input_config = match input {
        CloudInput::Bytes { data, .. } => json!({
            "content": BASE64_STANDARD.encode(data),
            "mimeType": PDF_MEDIA_TYPE,
        }),
        CloudInput::Uri(uri) if uri.starts_with("gs://") => json!({
            "gcsSource": { "uri": uri },
            "mimeType": PDF_MEDIA_TYPE,
        }),
        CloudInput::Uri(uri) => {
            return Err(OcrError::Unsupported(format!(
                "PDF documents must be inline or in Cloud Storage, got {uri}"
            )));
        }
    };
    let pages: Vec<u32> = (1..=PDF_PAGE_LIMIT).collect();
    Ok(json!({
        "inputConfig": input_config,
        "features": [{ "type": FEATURE }],
        "pages": pages,
    }))
}

/// Join per-page text and average the page confidences.
fn collect_text(responses: Vec<AnnotateImageResponse>) -> Result<OcrText, OcrError> {
    let mut texts = Vec::new();
    let mut confidences = Vec::new();

    for response in responses {
        if let Some(err) = response.error {
            return Err(status_error(err));
        }
        if let Some(annotation) = response.full_text_annotation {
            confidences.extend(annotation.pages.iter().filter_map(|p| p.confidence));
            if !annotation.text.trim().is_empty() {
                texts.push(annotation.text);
            }
        }
    }

    if texts.is_empty() {
        return Err(OcrError::EmptyResponse);
    }

    let confidence = if confidences.is_empty() {
        None
    } else {
        Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
    };

    Ok(OcrText {
        text: texts.join("\n"),
        confidence,
    })
}

fn status_error(status: Status) -> OcrError {
    OcrError::Service {
        status: u16::try_from(status.code).unwrap_or(0),
        message: status.message,
    }
}
