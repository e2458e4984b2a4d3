//! Vertex AI `generateContent` over REST.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::generate::{GenerateError, TextGenerator};

const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";
/// Deterministic sampling; both passes want repeatable JSON.
const TEMPERATURE: f32 = 0.0;

pub struct VertexClient {
    client: reqwest::Client,
    base_url: String,
    project: String,
    location: String,
    access_token: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl VertexClient {
    /// Client for the regional endpoint of `location`, authenticated with an
    /// OAuth access token.
    pub fn new(project: &str, location: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://{location}-aiplatform.googleapis.com/v1"),
            project: project.to_string(),
            location: location.to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Point at another API root, such as a private endpoint or a proxy.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url, self.project, self.location, model
        )
    }
}

#[async_trait]
impl TextGenerator for VertexClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError> {
        let url = self.endpoint(model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "responseMimeType": "application/json",
            },
        });

        debug!(model, prompt_chars = prompt.len(), "calling Vertex AI");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body, retry_after));
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| GenerateError::Request(format!("invalid response body: {e}")))?;
        response_text(parsed)
    }
}

fn status_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> GenerateError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains(RESOURCE_EXHAUSTED) {
        GenerateError::RateLimited {
            retry_after,
            message: body,
        }
    } else {
        GenerateError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn response_text(response: GenerateContentResponse) -> Result<String, GenerateError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(GenerateError::EmptyResponse)
    } else {
        Ok(text)
    }
}
