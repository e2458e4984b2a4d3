use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    /// Quota or rate limit hit; the backend may suggest a wait.
    #[error("rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
    #[error("model service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model returned no text")]
    EmptyResponse,
    #[error("model call timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

impl GenerateError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// A generative text model reachable by identifier.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run `prompt` against `model` and return the raw response text.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError>;
}
