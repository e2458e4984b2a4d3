use std::time::Duration;

use certscan_ai::RetryPolicy;

/// Tunables for one [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model identifiers, tried in order.
    pub models: Vec<String>,
    /// Wait before retrying a rate-limited model.
    pub backoff: Duration,
    /// Same-model retries after a rate limit.
    pub rate_limit_retries: u32,
    pub model_timeout: Duration,
    pub ocr_timeout: Duration,
    /// OCR characters shown to the classifier.
    pub classification_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            models: certscan_ai::DEFAULT_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            backoff: certscan_ai::DEFAULT_BACKOFF,
            rate_limit_retries: 1,
            model_timeout: certscan_ai::DEFAULT_CALL_TIMEOUT,
            ocr_timeout: certscan_ocr::DEFAULT_CALL_TIMEOUT,
            classification_chars: certscan_ai::CLASSIFICATION_CHAR_BUDGET,
        }
    }
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.models.clone())
            .with_backoff(self.backoff)
            .with_rate_limit_retries(self.rate_limit_retries)
            .with_call_timeout(self.model_timeout)
    }
}
