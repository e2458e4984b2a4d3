//! Model-candidate retry policy shared by both passes.
//!
//! Candidates are tried in order. A rate-limited call waits a fixed backoff
//! and retries the same model (once by default); any other failure, timeouts
//! included, moves straight on to the next candidate.

use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use thiserror::Error;
use tracing::{debug, warn};

use crate::generate::{GenerateError, TextGenerator};

pub const DEFAULT_MODELS: &[&str] = &["gemini-2.0-flash-001", "gemini-1.5-flash-002"];
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum ModelCallError {
    #[error("no model candidates configured")]
    NoCandidates,
    #[error("all model candidates failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: GenerateError,
    },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    models: Vec<String>,
    backoff: Duration,
    rate_limit_retries: u32,
    call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MODELS.iter().map(|m| m.to_string()).collect())
    }
}

impl RetryPolicy {
    pub fn new(models: Vec<String>) -> Self {
        Self {
            models,
            backoff: DEFAULT_BACKOFF,
            rate_limit_retries: 1,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Same-model retries allowed after a rate limit, per candidate.
    pub fn with_rate_limit_retries(mut self, retries: u32) -> Self {
        self.rate_limit_retries = retries;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run `prompt` through the candidates until one answers.
    ///
    /// `pass` only labels log lines.
    pub async fn run(
        &self,
        generator: &dyn TextGenerator,
        prompt: &str,
        pass: &'static str,
    ) -> Result<String, ModelCallError> {
        let mut attempts = 0usize;
        let mut last = None;

        for model in &self.models {
            let backoff = ConstantBuilder::default()
                .with_delay(self.backoff)
                .with_max_times(self.rate_limit_retries as usize);

            let result = (|| {
                attempts += 1;
                self.call(generator, model, prompt)
            })
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(GenerateError::is_rate_limit)
            .notify(|err: &GenerateError, delay: Duration| {
                let hint = match err {
                    GenerateError::RateLimited { retry_after, .. } => *retry_after,
                    _ => None,
                };
                warn!(
                    pass,
                    model = %model,
                    backoff_ms = delay.as_millis() as u64,
                    retry_after_ms = hint.map(|d| d.as_millis() as u64),
                    "rate limited, retrying same model after backoff"
                );
            })
            .await;

            match result {
                Ok(text) => {
                    debug!(pass, model = %model, attempts, chars = text.len(), "model answered");
                    return Ok(text);
                }
                Err(err) => {
                    warn!(
                        pass,
                        model = %model,
                        error = %err,
                        "model call failed, trying next candidate"
                    );
                    last = Some(err);
                }
            }
        }

        match last {
            Some(last) => Err(ModelCallError::Exhausted { attempts, last }),
            None => Err(ModelCallError::NoCandidates),
        }
    }

    async fn call(
        &self,
        generator: &dyn TextGenerator,
        model: &str,
        prompt: &str,
    ) -> Result<String, GenerateError> {
        match tokio::time::timeout(self.call_timeout, generator.generate(model, prompt)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(GenerateError::EmptyResponse),
            Ok(result) => result,
            Err(_) => Err(GenerateError::Timeout(self.call_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedGenerator};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(vec!["primary".into(), "secondary".into()])
    }

    #[tokio::test(start_paused = true)]
    async fn first_model_success_makes_one_call() {
        let generator = ScriptedGenerator::new().script("primary", vec![Reply::text("ok")]);
        let out = policy().run(&generator, "p", "test").await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(generator.calls(), vec!["primary"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retries_same_model_after_backoff() {
        let generator = ScriptedGenerator::new()
            .script("primary", vec![Reply::RateLimited, Reply::text("second try")]);
        let start = Instant::now();
        let out = policy().run(&generator, "p", "test").await.unwrap();
        assert_eq!(out, "second try");
        assert_eq!(generator.calls(), vec!["primary", "primary"]);
        assert!(start.elapsed() >= DEFAULT_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_rate_limit_moves_to_next_model() {
        let generator = ScriptedGenerator::new()
            .script("primary", vec![Reply::RateLimited, Reply::RateLimited])
            .script("secondary", vec![Reply::text("fallback")]);
        let out = policy().run(&generator, "p", "test").await.unwrap();
        assert_eq!(out, "fallback");
        assert_eq!(generator.calls(), vec!["primary", "primary", "secondary"]);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_skip_backoff() {
        let generator = ScriptedGenerator::new()
            .script("primary", vec![Reply::Fail])
            .script("secondary", vec![Reply::text("fallback")]);
        let start = Instant::now();
        policy().run(&generator, "p", "test").await.unwrap();
        assert_eq!(generator.calls(), vec!["primary", "secondary"]);
        assert!(start.elapsed() < DEFAULT_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn all_candidates_failing_is_exhausted() {
        let generator = ScriptedGenerator::new()
            .script("primary", vec![Reply::Fail])
            .script("secondary", vec![Reply::RateLimited, Reply::Fail]);
        let err = policy().run(&generator, "p", "test").await.unwrap_err();
        match err {
            ModelCallError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(last, GenerateError::Status { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_ordinary_failure() {
        let generator = ScriptedGenerator::new()
            .script("primary", vec![Reply::Hang])
            .script("secondary", vec![Reply::text("fallback")]);
        let out = policy()
            .with_call_timeout(Duration::from_secs(5))
            .run(&generator, "p", "test")
            .await
            .unwrap();
        assert_eq!(out, "fallback");
    }

    #[tokio::test(start_paused = true)]
    async fn blank_answer_is_a_failure() {
        let generator = ScriptedGenerator::new()
            .script("primary", vec![Reply::text("  \n")])
            .script("secondary", vec![Reply::text("{}")]);
        let out = policy().run(&generator, "p", "test").await.unwrap();
        assert_eq!(out, "{}");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_rate_limit_retries_moves_on_without_waiting() {
        let generator = ScriptedGenerator::new()
            .script("primary", vec![Reply::RateLimited])
            .script("secondary", vec![Reply::text("fallback")]);
        let start = Instant::now();
        let out = policy()
            .with_rate_limit_retries(0)
            .run(&generator, "p", "test")
            .await
            .unwrap();
        assert_eq!(out, "fallback");
        assert_eq!(generator.calls(), vec!["primary", "secondary"]);
        assert!(start.elapsed() < DEFAULT_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_configurable() {
        let generator = ScriptedGenerator::new()
            .script("primary", vec![Reply::RateLimited, Reply::text("ok")]);
        let start = Instant::now();
        policy()
            .with_backoff(Duration::from_secs(7))
            .run(&generator, "p", "test")
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test]
    async fn empty_candidate_list() {
        let generator = ScriptedGenerator::new();
        let err = RetryPolicy::new(vec![]).run(&generator, "p", "test").await.unwrap_err();
        assert!(matches!(err, ModelCallError::NoCandidates));
    }
}
