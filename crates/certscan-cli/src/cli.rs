use std::path::PathBuf;

use anyhow::Context;
use certscan_core::SchemaRegistry;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "certscan",
    version,
    about = "Read, classify and extract fields from faculty certificates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze certificate files and print one JSON document per file.
    Analyze(AnalyzeArgs),
    /// List the registered certificate types and their fields.
    Types(SchemaArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// JSON file with certificate type schemas (defaults to the built-in set).
    #[arg(long, env = "CERTSCAN_SCHEMAS")]
    pub schemas: Option<PathBuf>,
}

impl SchemaArgs {
    pub fn load(&self) -> anyhow::Result<SchemaRegistry> {
        match &self.schemas {
            Some(path) => SchemaRegistry::from_json_file(path)
                .with_context(|| format!("loading schemas from {}", path.display())),
            None => Ok(SchemaRegistry::builtin()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Local files, or gs:// / https:// URIs read by the cloud OCR service.
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Media type to use instead of inferring it from the file extension.
    #[arg(long)]
    pub media_type: Option<String>,

    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Files analyzed at the same time.
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    #[arg(long, env = "VISION_API_KEY", hide_env_values = true)]
    pub vision_api_key: Option<String>,

    /// OAuth access token for Vertex AI (and Cloud Vision without an API key).
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, env = "VERTEX_PROJECT")]
    pub vertex_project: Option<String>,

    #[arg(long, env = "VERTEX_LOCATION", default_value = "us-central1")]
    pub vertex_location: String,

    /// Override the Cloud Vision API root.
    #[arg(long, env = "VISION_BASE_URL")]
    pub vision_base_url: Option<String>,

    /// Override the Vertex AI API root.
    #[arg(long, env = "VERTEX_BASE_URL")]
    pub vertex_base_url: Option<String>,

    /// Model identifiers in the order they are tried.
    #[arg(long, env = "CERTSCAN_MODELS", value_delimiter = ',')]
    pub models: Vec<String>,

    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    pub tesseract: PathBuf,

    #[arg(long, env = "TESSERACT_LANG", default_value = "eng")]
    pub tesseract_lang: String,

    /// Do not fall back to local OCR when cloud OCR fails on an image.
    #[arg(long, default_value_t = false)]
    pub no_local_ocr: bool,

    /// Timeout in seconds for each OCR and model call.
    #[arg(long, env = "CERTSCAN_CALL_TIMEOUT_SECS")]
    pub call_timeout_secs: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}
