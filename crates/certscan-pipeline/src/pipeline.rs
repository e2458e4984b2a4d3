//! Request-scoped orchestration: normalize, extract text, classify,
//! extract fields, reconcile. Each stage awaits the previous one; nothing is
//! shared between requests except the read-only registry.

use std::sync::Arc;

use certscan_ai::{Classifier, ExtractError, FieldExtractor, TextGenerator};
use certscan_core::{ExtractionRequest, ReconciledAnalysis, SchemaRegistry};
use certscan_ocr::{CloudOcr, LocalOcr, MIN_TEXT_CHARS, TextExtractor, normalize};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::reconcile::{reconcile, unrecognized};

pub struct Pipeline {
    registry: Arc<SchemaRegistry>,
    text: TextExtractor,
    classifier: Classifier,
    fields: FieldExtractor,
}

impl Pipeline {
    /// Wire the stages from one cloud OCR backend and one model backend.
    /// Local OCR is off until [`Pipeline::with_local_ocr`].
    pub fn new(
        registry: Arc<SchemaRegistry>,
        cloud: Arc<dyn CloudOcr>,
        generator: Arc<dyn TextGenerator>,
        config: &PipelineConfig,
    ) -> Self {
        let policy = config.retry_policy();
        Self {
            text: TextExtractor::new(cloud).with_call_timeout(config.ocr_timeout),
            classifier: Classifier::new(registry.clone(), generator.clone(), policy.clone())
                .with_char_budget(config.classification_chars),
            fields: FieldExtractor::new(registry.clone(), generator, policy),
            registry,
        }
    }

    /// Enable the local OCR fallback for images.
    pub fn with_local_ocr(mut self, local: Arc<dyn LocalOcr>) -> Self {
        self.text = self.text.with_local(local);
        self
    }

    /// Run one request through every stage.
    pub async fn analyze(
        &self,
        request: ExtractionRequest,
    ) -> Result<ReconciledAnalysis, PipelineError> {
        let source = normalize(request)?;

        let ocr = self.text.extract(&source).await;
        if !ocr.has_usable_text(MIN_TEXT_CHARS + 1) {
            let message = ocr.error.unwrap_or_else(|| "no text extracted".to_string());
            warn!(filename = %source.filename(), error = %message, "text extraction failed");
            return Err(PipelineError::Extraction {
                message,
                is_pdf: source.is_pdf(),
            });
        }
        info!(
            filename = %source.filename(),
            ocr_source = %ocr.source,
            chars = ocr.text.len(),
            "text extracted"
        );

        let classification = self.classifier.classify(&ocr.text).await?;
        if classification.is_unknown() {
            info!(
                filename = %source.filename(),
                reason = %classification.reason,
                "certificate not recognized"
            );
            return Ok(unrecognized(&classification));
        }

        let schema = self
            .registry
            .get(&classification.detected_type)
            .ok_or_else(|| ExtractError::UnknownType(classification.detected_type.clone()))?;
        let fields = self
            .fields
            .extract_fields(&ocr.text, &classification.detected_type)
            .await?;

        let analysis = reconcile(&classification, fields, schema);
        info!(
            filename = %source.filename(),
            detected_type = %analysis.detected_type,
            missing = analysis.missing_required.len(),
            "certificate analyzed"
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use certscan_ai::GenerateError;
    use certscan_core::{DocumentSource, FieldValue};
    use certscan_ocr::{CloudInput, LocalInput, OcrError, OcrText};

    const FDP_TEXT: &str = "\
        CERTIFICATE OF PARTICIPATION\n\
        This is to certify that Dr. John Doe\n\
        has participated in the Faculty Development Program on Machine Learning\n\
        Organized by IIT Bombay\n\
        10 July 2024 to 15 July 2024\n\
        Mode: Online";

    const CLASSIFY_FDP: &str =
        r#"{"detected_type": "FDP", "confidence": 0.93, "reason": "Faculty Development Program wording"}"#;

    const EXTRACT_FDP: &str = r#"```json
{
  "extracted_fields": {
    "faculty_name": "Dr. John Doe",
    "program_title": "Machine Learning",
    "organizer": "IIT Bombay",
    "start_date": "10 July 2024",
    "end_date": "15 July 2024",
    "duration_days": null,
    "mode": "online",
    "academic_year": null
  },
  "field_confidence": {"faculty_name": 0.95, "organizer": 0.9},
  "missing_required": []
}
```"#;

    struct FakeCloud {
        text: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CloudOcr for FakeCloud {
        async fn image_text(&self, _input: CloudInput<'_>) -> Result<OcrText, OcrError> {
            self.answer()
        }

        async fn document_text(&self, _input: CloudInput<'_>) -> Result<OcrText, OcrError> {
            self.answer()
        }
    }

    impl FakeCloud {
        fn answer(&self) -> Result<OcrText, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.text {
                Some(text) => Ok(OcrText {
                    text: text.to_string(),
                    confidence: Some(0.97),
                }),
                None => Err(OcrError::Service {
                    status: 503,
                    message: "unavailable".into(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct FakeLocal {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocalOcr for FakeLocal {
        async fn recognize(&self, _input: LocalInput<'_>) -> Result<OcrText, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(OcrText {
                text: FDP_TEXT.to_string(),
                confidence: Some(0.6),
            })
        }
    }

    /// Answers pass 1 and pass 2 by recognising the prompt.
    struct FakeModel {
        classification: &'static str,
        extraction: &'static str,
        classify_calls: AtomicUsize,
        extract_calls: AtomicUsize,
    }

    impl FakeModel {
        fn new(classification: &'static str, extraction: &'static str) -> Self {
            Self {
                classification,
                extraction,
                classify_calls: AtomicUsize::new(0),
                extract_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FakeModel {
        async fn generate(&self, _model: &str, prompt: &str) -> Result<String, GenerateError> {
            if prompt.contains("\"detected_type\"") {
                self.classify_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.classification.to_string())
            } else {
                self.extract_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.extraction.to_string())
            }
        }
    }

    fn cloud(text: Option<&'static str>) -> Arc<FakeCloud> {
        Arc::new(FakeCloud {
            text,
            calls: AtomicUsize::new(0),
        })
    }

    fn pipeline(cloud: Arc<FakeCloud>, model: Arc<FakeModel>, local: Arc<FakeLocal>) -> Pipeline {
        let config = PipelineConfig {
            models: vec!["test-model".into()],
            backoff: Duration::from_millis(10),
            ..PipelineConfig::default()
        };
        Pipeline::new(Arc::new(SchemaRegistry::builtin()), cloud, model, &config)
            .with_local_ocr(local)
    }

    fn image_request() -> ExtractionRequest {
        ExtractionRequest::new(DocumentSource::Bytes(b"\xFF\xD8\xFF fake".to_vec()), "fdp.jpg")
    }

    #[tokio::test]
    async fn image_happy_path() {
        let model = Arc::new(FakeModel::new(CLASSIFY_FDP, EXTRACT_FDP));
        let local = Arc::new(FakeLocal::default());
        let pipeline = pipeline(cloud(Some(FDP_TEXT)), model.clone(), local.clone());

        let analysis = pipeline.analyze(image_request()).await.unwrap();

        assert!(analysis.is_recognized);
        assert_eq!(analysis.detected_type, "FDP");
        assert_eq!(analysis.table_name, "fdp_attended");
        assert_eq!(
            analysis.extracted["organizer"],
            Some(FieldValue::Text("IIT Bombay".into()))
        );
        assert_eq!(analysis.extracted["duration_days"], Some(FieldValue::Integer(6)));
        assert_eq!(analysis.extracted["mode"], Some(FieldValue::Text("Online".into())));
        assert_eq!(
            analysis.extracted["academic_year"],
            Some(FieldValue::Text("2024-25".into()))
        );
        assert_eq!(
            analysis.extracted["start_date"],
            Some(FieldValue::Text("2024-07-10".into()))
        );
        assert!(analysis.missing_required.is_empty());
        assert!((analysis.overall_confidence - 0.93).abs() < 1e-6);
        assert_eq!(local.calls.load(Ordering::SeqCst), 0);
        assert_eq!(model.classify_calls.load(Ordering::SeqCst), 1);
        assert_eq!(model.extract_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pdf_cloud_failure_never_uses_local_ocr() {
        let model = Arc::new(FakeModel::new(CLASSIFY_FDP, EXTRACT_FDP));
        let local = Arc::new(FakeLocal::default());
        let pipeline = pipeline(cloud(None), model.clone(), local.clone());

        let request =
            ExtractionRequest::new(DocumentSource::Bytes(b"%PDF-1.7".to_vec()), "cert.pdf");
        let err = pipeline.analyze(request).await.unwrap_err();

        match &err {
            PipelineError::Extraction { message, is_pdf } => {
                assert!(*is_pdf);
                assert!(message.starts_with("PDF processing failed"));
                assert!(message.ends_with("Fallback disabled for PDFs."));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.hint().contains("scanned"));
        assert_eq!(local.calls.load(Ordering::SeqCst), 0);
        assert_eq!(model.classify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn near_empty_text_stops_before_classification() {
        let model = Arc::new(FakeModel::new(CLASSIFY_FDP, EXTRACT_FDP));
        let local = Arc::new(FakeLocal::default());
        let pipeline = pipeline(cloud(Some("  tiny \n")), model.clone(), local);

        let request =
            ExtractionRequest::new(DocumentSource::Bytes(b"%PDF-1.7".to_vec()), "cert.pdf");
        let err = pipeline.analyze(request).await.unwrap_err();

        assert!(matches!(err, PipelineError::Extraction { is_pdf: true, .. }));
        assert_eq!(model.classify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn image_cloud_failure_falls_back_to_local() {
        let model = Arc::new(FakeModel::new(CLASSIFY_FDP, EXTRACT_FDP));
        let local = Arc::new(FakeLocal::default());
        let pipeline = pipeline(cloud(None), model, local.clone());

        let analysis = pipeline.analyze(image_request()).await.unwrap();
        assert!(analysis.is_recognized);
        assert_eq!(local.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_short_circuits_field_extraction() {
        let model = Arc::new(FakeModel::new(
            r#"{"detected_type": "UNKNOWN", "confidence": 0.4, "reason": "Looks like an invoice"}"#,
            EXTRACT_FDP,
        ));
        let pipeline = pipeline(
            cloud(Some("INVOICE No 4411 Total amount payable 1200")),
            model.clone(),
            Arc::new(FakeLocal::default()),
        );

        let analysis = pipeline.analyze(image_request()).await.unwrap();

        assert!(!analysis.is_recognized);
        assert!(analysis.extracted.is_empty());
        assert!(analysis.missing_required.is_empty());
        assert_eq!(model.extract_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unparseable_extraction_is_a_failure() {
        let model = Arc::new(FakeModel::new(CLASSIFY_FDP, "no json here"));
        let pipeline = pipeline(cloud(Some(FDP_TEXT)), model, Arc::new(FakeLocal::default()));

        let err = pipeline.analyze(image_request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::FieldExtraction(ExtractError::Parse(_))));
        assert_eq!(err.report().error, "Processing failed");
    }

    #[tokio::test]
    async fn missing_required_fields_are_reported() {
        let model = Arc::new(FakeModel::new(
            CLASSIFY_FDP,
            r#"{"extracted_fields": {"faculty_name": "Dr. John Doe", "program_title": "ML",
                "start_date": "2024-07-10"}, "missing_required": ["organizer", "mode"]}"#,
        ));
        let pipeline = pipeline(cloud(Some(FDP_TEXT)), model, Arc::new(FakeLocal::default()));

        let analysis = pipeline.analyze(image_request()).await.unwrap();
        // academic_year is derived from the start date, mode is optional.
        assert_eq!(analysis.missing_required, vec!["organizer"]);
        assert_eq!(
            analysis.extracted["academic_year"],
            Some(FieldValue::Text("2024-25".into()))
        );
    }

    #[tokio::test]
    async fn local_path_source_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let model = Arc::new(FakeModel::new(CLASSIFY_FDP, EXTRACT_FDP));
        let pipeline = pipeline(cloud(Some(FDP_TEXT)), model, Arc::new(FakeLocal::default()));
        let request = ExtractionRequest::new(DocumentSource::Path(path), "cert.jpg");

        assert!(pipeline.analyze(request).await.unwrap().is_recognized);
    }

    #[tokio::test]
    async fn empty_upload_is_a_source_error() {
        let model = Arc::new(FakeModel::new(CLASSIFY_FDP, EXTRACT_FDP));
        let cloud = cloud(Some(FDP_TEXT));
        let pipeline = pipeline(cloud.clone(), model, Arc::new(FakeLocal::default()));

        let request = ExtractionRequest::new(DocumentSource::Bytes(Vec::new()), "empty.png");
        let err = pipeline.analyze(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::Source(_)));
        assert_eq!(cloud.calls.load(Ordering::SeqCst), 0);
    }
}
