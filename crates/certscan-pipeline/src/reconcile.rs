//! Merge of the two model passes into the outbound analysis.
//!
//! `missing_required` is computed from the schema: it lists the required
//! fields whose final value is null. Names the model reported for optional
//! fields, or for fields it did in fact fill, are dropped.

use std::collections::BTreeMap;

use certscan_core::{
    CertificateTypeSchema, ClassificationResult, ExtractedFields, FieldExtractionResult,
    ReconciledAnalysis, UNKNOWN_TYPE,
};
use tracing::debug;

/// Analysis for a recognized certificate.
pub fn reconcile(
    classification: &ClassificationResult,
    fields: FieldExtractionResult,
    schema: &CertificateTypeSchema,
) -> ReconciledAnalysis {
    let missing_required: Vec<String> = schema
        .required_fields()
        .filter(|f| !matches!(fields.extracted_fields.get(&f.name), Some(Some(_))))
        .map(|f| f.name.clone())
        .collect();

    for name in &fields.missing_required {
        if !missing_required.contains(name) {
            debug!(
                field = %name,
                "ignoring model-reported missing field that is optional or filled"
            );
        }
    }

    ReconciledAnalysis {
        is_recognized: classification.detected_type != UNKNOWN_TYPE,
        detected_type: classification.detected_type.clone(),
        type_confidence: classification.confidence,
        reason: classification.reason.clone(),
        certificate_type: schema.display_name.clone(),
        table_name: schema.storage_table.clone(),
        section_code: schema.section_code.clone(),
        extracted: fields.extracted_fields,
        field_confidence: fields.field_confidence,
        overall_confidence: classification.confidence,
        missing_required,
    }
}

/// Analysis for an `UNKNOWN` classification; pass 2 never ran.
pub fn unrecognized(classification: &ClassificationResult) -> ReconciledAnalysis {
    ReconciledAnalysis {
        is_recognized: false,
        detected_type: UNKNOWN_TYPE.to_string(),
        type_confidence: classification.confidence,
        reason: classification.reason.clone(),
        certificate_type: String::new(),
        table_name: String::new(),
        section_code: String::new(),
        extracted: ExtractedFields::new(),
        field_confidence: BTreeMap::new(),
        overall_confidence: classification.confidence,
        missing_required: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certscan_core::{FieldValue, SchemaRegistry};

    fn fdp_fields(values: &[(&str, Option<FieldValue>)]) -> FieldExtractionResult {
        let registry = SchemaRegistry::builtin();
        let schema = registry.get("FDP").unwrap();
        let mut extracted: ExtractedFields =
            schema.field_names().map(|n| (n.to_string(), None)).collect();
        for (name, value) in values {
            extracted.insert(name.to_string(), value.clone());
        }
        FieldExtractionResult {
            extracted_fields: extracted,
            field_confidence: BTreeMap::from([("faculty_name".to_string(), 0.95)]),
            missing_required: vec!["mode".into(), "organizer".into()],
        }
    }

    fn fdp_classification() -> ClassificationResult {
        ClassificationResult {
            detected_type: "FDP".into(),
            confidence: 0.88,
            reason: "FDP wording".into(),
        }
    }

    #[test]
    fn recognized_analysis_carries_schema_metadata() {
        let registry = SchemaRegistry::builtin();
        let schema = registry.get("FDP").unwrap();
        let analysis = reconcile(
            &fdp_classification(),
            fdp_fields(&[("faculty_name", Some("Dr. A. Kumar".into()))]),
            schema,
        );
        assert!(analysis.is_recognized);
        assert_eq!(analysis.table_name, "fdp_attended");
        assert_eq!(analysis.section_code, "3.4.1");
        assert_eq!(analysis.certificate_type, "Faculty Development Program");
        assert_eq!(analysis.overall_confidence, 0.88);
        assert_eq!(analysis.type_confidence, 0.88);
        assert_eq!(analysis.field_confidence["faculty_name"], 0.95);
    }

    #[test]
    fn missing_required_follows_schema() {
        let registry = SchemaRegistry::builtin();
        let schema = registry.get("FDP").unwrap();
        let analysis = reconcile(
            &fdp_classification(),
            fdp_fields(&[
                ("faculty_name", Some("Dr. A. Kumar".into())),
                ("program_title", Some("Deep Learning".into())),
                ("start_date", Some("2024-07-10".into())),
            ]),
            schema,
        );
        // `mode` is optional, so the model's report is dropped; organizer and
        // academic_year are required and null.
        assert_eq!(analysis.missing_required, vec!["organizer", "academic_year"]);
    }

    #[test]
    fn unknown_is_empty() {
        let analysis = unrecognized(&ClassificationResult::unknown("not a certificate"));
        assert!(!analysis.is_recognized);
        assert_eq!(analysis.detected_type, UNKNOWN_TYPE);
        assert!(analysis.extracted.is_empty());
        assert!(analysis.field_confidence.is_empty());
        assert!(analysis.missing_required.is_empty());
        assert_eq!(analysis.reason, "not a certificate");
    }
}
