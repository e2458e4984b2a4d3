//! Pass 1: decide which registered certificate type a document is.
//!
//! Anything the model says that does not resolve to a registered type key
//! (no answer, unparseable JSON, `UNKNOWN`, an invented key) becomes
//! `UNKNOWN`, so pass 2 is only ever asked about types it has a schema for.

use std::sync::Arc;

use certscan_core::{ClassificationResult, SchemaRegistry, UNKNOWN_TYPE};
use tracing::{info, warn};

use crate::generate::TextGenerator;
use crate::parse::{RawClassification, parse_model_json};
use crate::prompts::{CLASSIFICATION_CHAR_BUDGET, classification_prompt};
use crate::retry::{ModelCallError, RetryPolicy};

pub struct Classifier {
    registry: Arc<SchemaRegistry>,
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    char_budget: usize,
}

impl Classifier {
    /// Pass-1 classifier over the types in `registry`.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        generator: Arc<dyn TextGenerator>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            generator,
            policy,
            char_budget: CLASSIFICATION_CHAR_BUDGET,
        }
    }

    pub fn with_char_budget(mut self, chars: usize) -> Self {
        self.char_budget = chars;
        self
    }

    /// Classify cleaned OCR text.
    ///
    /// Only model-call exhaustion is an error; every other failure is an
    /// `UNKNOWN` result.
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult, ModelCallError> {
        let prompt = classification_prompt(&self.registry, text, self.char_budget);
        tracing::debug!(prompt_chars = prompt.len(), "classification prompt built");

        let answer = self.policy.run(self.generator.as_ref(), &prompt, "classify").await?;

        let raw: RawClassification = match parse_model_json(&answer) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "unparseable classification answer, treating as UNKNOWN");
                return Ok(ClassificationResult::unknown(
                    "Could not interpret the classification response",
                ));
            }
        };

        let result = self.resolve(raw);
        info!(
            detected_type = %result.detected_type,
            confidence = result.confidence,
            "classified certificate"
        );
        Ok(result)
    }

    fn resolve(&self, raw: RawClassification) -> ClassificationResult {
        let reason = raw.reason.unwrap_or_default();
        let confidence = raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0) as f32;

        let Some(candidate) = raw.detected_type.filter(|t| !t.trim().is_empty()) else {
            return ClassificationResult::unknown(or_default(reason, "No certificate type given"));
        };

        if candidate.trim().eq_ignore_ascii_case(UNKNOWN_TYPE) {
            return ClassificationResult {
                detected_type: UNKNOWN_TYPE.to_string(),
                confidence,
                reason: or_default(reason, "Document does not match a known category"),
            };
        }

        match self.registry.resolve(&candidate) {
            Some(schema) => ClassificationResult {
                detected_type: schema.type_key.clone(),
                confidence,
                reason,
            },
            None => {
                warn!(
                    candidate = %candidate,
                    known = ?self.registry.type_keys().collect::<Vec<_>>(),
                    "model answered with an unregistered type"
                );
                ClassificationResult::unknown(format!("Unrecognized certificate type: {candidate}"))
            }
        }
    }
}

fn or_default(reason: String, fallback: &str) -> String {
    if reason.trim().is_empty() {
        fallback.to_string()
    } else {
        reason
    }
}
