//! `certscan analyze`: run the pipeline over several files concurrently.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use certscan_ai::VertexClient;
use certscan_core::{DocumentSource, ExtractionRequest, ReconciledAnalysis};
use certscan_ocr::{TesseractEngine, VisionAuth, VisionClient};
use certscan_pipeline::{FailureReport, Pipeline, PipelineConfig};
use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::AnalyzeArgs;

const REMOTE_SCHEMES: &[&str] = &["gs://", "https://", "http://"];

#[derive(Serialize)]
struct FileOutcome<'a> {
    file: &'a str,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Outcome {
    Analysis(ReconciledAnalysis),
    Failure(FailureReport),
}

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let registry = Arc::new(args.schema.load()?);
    let pipeline = build_pipeline(&args, registry)?;
    let start = Instant::now();

    let pipeline = &pipeline;
    let media_type = args.media_type.as_deref();
    let mut outcomes: Vec<(usize, Outcome)> = futures::stream::iter(args.files.iter().enumerate())
        .map(|(index, file)| async move {
            let outcome = match pipeline.analyze(request_for(file, media_type)).await {
                Ok(analysis) => Outcome::Analysis(analysis),
                Err(err) => {
                    warn!(file = %file, error = %err, "analysis failed");
                    Outcome::Failure(err.report())
                }
            };
            (index, outcome)
        })
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(index, _)| *index);

    let mut failures = 0usize;
    for (index, outcome) in outcomes {
        if matches!(outcome, Outcome::Failure(_)) {
            failures += 1;
        }
        let doc = FileOutcome {
            file: &args.files[index],
            outcome,
        };
        let json = if args.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        println!("{json}");
    }

    info!(
        files = args.files.len(),
        failures,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "analysis complete"
    );
    Ok(())
}

fn build_pipeline(
    args: &AnalyzeArgs,
    registry: Arc<certscan_core::SchemaRegistry>,
) -> anyhow::Result<Pipeline> {
    let vision_auth = match (&args.vision_api_key, &args.access_token) {
        (Some(key), _) => VisionAuth::ApiKey(key.clone()),
        (None, Some(token)) => VisionAuth::Bearer(token.clone()),
        (None, None) => bail!("cloud OCR needs VISION_API_KEY or GOOGLE_ACCESS_TOKEN"),
    };

    let project = args
        .vertex_project
        .as_deref()
        .context("VERTEX_PROJECT is required for the generative model")?;
    let token = args
        .access_token
        .as_deref()
        .context("GOOGLE_ACCESS_TOKEN is required for Vertex AI")?;

    let mut config = PipelineConfig::default();
    if !args.models.is_empty() {
        config.models = args.models.clone();
    }
    if let Some(secs) = args.call_timeout_secs {
        config.ocr_timeout = Duration::from_secs(secs);
        config.model_timeout = Duration::from_secs(secs);
    }

    info!(
        models = ?config.models,
        location = %args.vertex_location,
        local_ocr = !args.no_local_ocr,
        "pipeline configured"
    );

    let mut vision = VisionClient::new(vision_auth);
    if let Some(base_url) = &args.vision_base_url {
        vision = vision.with_base_url(base_url);
    }
    let mut vertex = VertexClient::new(project, &args.vertex_location, token);
    if let Some(base_url) = &args.vertex_base_url {
        vertex = vertex.with_base_url(base_url);
    }

    let pipeline = Pipeline::new(registry, Arc::new(vision), Arc::new(vertex), &config);

    Ok(if args.no_local_ocr {
        pipeline
    } else {
        pipeline.with_local_ocr(Arc::new(TesseractEngine::new(
            args.tesseract.clone(),
            args.tesseract_lang.clone(),
        )))
    })
}

/// Remote URIs are handed to the cloud service; anything else is a local path.
fn request_for(file: &str, media_type: Option<&str>) -> ExtractionRequest {
    let is_remote = REMOTE_SCHEMES
        .iter()
        .any(|s| file.to_ascii_lowercase().starts_with(s));

    let (source, filename) = if is_remote {
        let name = file.rsplit('/').next().unwrap_or(file);
        (DocumentSource::Uri(file.to_string()), name.to_string())
    } else {
        let path = PathBuf::from(file);
        let name = file_name(&path);
        (DocumentSource::Path(path), name)
    };

    let request = ExtractionRequest::new(source, filename);
    match media_type {
        Some(media_type) => request.with_media_type(media_type),
        None => request,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
