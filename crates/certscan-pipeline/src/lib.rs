//! Certificate ingestion pipeline: uploaded file in, reconciled analysis or
//! user-facing failure out.

mod config;
mod error;
mod pipeline;
mod reconcile;

pub use config::PipelineConfig;
pub use error::{FailureReport, PipelineError};
pub use pipeline::Pipeline;
pub use reconcile::{reconcile, unrecognized};
