//! Generative-model layer: pass 1 classifies a certificate, pass 2 extracts
//! its fields. Both passes go through a [`RetryPolicy`] over a
//! [`TextGenerator`] backend.

mod classifier;
mod fields;
mod generate;
mod parse;
mod prompts;
mod retry;
#[cfg(test)]
mod testing;

pub use classifier::Classifier;
pub use fields::{ExtractError, FieldExtractor};
pub use generate::{GenerateError, TextGenerator};
pub use parse::ParseError;
pub use prompts::{CLASSIFICATION_CHAR_BUDGET, classification_prompt, extraction_prompt};
pub use retry::{DEFAULT_BACKOFF, DEFAULT_CALL_TIMEOUT, DEFAULT_MODELS, ModelCallError, RetryPolicy};

#[cfg(feature = "vertex")]
mod vertex;
#[cfg(feature = "vertex")]
pub use vertex::VertexClient;
