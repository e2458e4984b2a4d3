//! Pass 2: extract the fields of a known certificate type.
//!
//! The model answer is reshaped onto the schema: every schema field gets a
//! key, unknown keys are dropped, and values are normalised (ISO dates,
//! integer durations, canonical select options). Duration and academic
//! year are derived from the dates when the model left them empty.

use std::collections::BTreeMap;
use std::sync::Arc;

use certscan_core::{
    CertificateTypeSchema, ExtractedFields, FieldExtractionResult, FieldKind, FieldSpec,
    FieldValue, SchemaRegistry, academic_year, inclusive_days, parse_certificate_date,
};
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::generate::TextGenerator;
use crate::parse::{ParseError, RawExtraction, parse_model_json};
use crate::prompts::extraction_prompt;
use crate::retry::{ModelCallError, RetryPolicy};

const DURATION_FIELD: &str = "duration_days";
const ACADEMIC_YEAR_FIELD: &str = "academic_year";
const START_DATE_FIELD: &str = "start_date";
const END_DATE_FIELD: &str = "end_date";

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The caller asked for a type the registry does not know.
    #[error("no schema registered for certificate type {0:?}")]
    UnknownType(String),
    #[error(transparent)]
    ModelCall(#[from] ModelCallError),
    #[error("failed to parse extraction results: {0}")]
    Parse(#[from] ParseError),
}

pub struct FieldExtractor {
    registry: Arc<SchemaRegistry>,
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl FieldExtractor {
    /// Pass-2 extractor; `registry` supplies the field list per type.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        generator: Arc<dyn TextGenerator>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            generator,
            policy,
        }
    }

    /// Extract the fields of `type_key` from `text`. Every schema field is
    /// present in the result, null when the certificate does not show it.
    pub async fn extract_fields(
        &self,
        text: &str,
        type_key: &str,
    ) -> Result<FieldExtractionResult, ExtractError> {
        let schema = self
            .registry
            .get(type_key)
            .ok_or_else(|| ExtractError::UnknownType(type_key.to_string()))?;

        let prompt = extraction_prompt(schema, text);
        debug!(type_key, prompt_chars = prompt.len(), "extraction prompt built");

        let answer = self.policy.run(self.generator.as_ref(), &prompt, "extract").await?;
        let raw: RawExtraction = parse_model_json(&answer).inspect_err(|e| {
            warn!(type_key, error = %e, "unparseable extraction answer");
        })?;

        let result = reshape(schema, raw);
        info!(
            type_key,
            found = result.extracted_fields.values().filter(|v| v.is_some()).count(),
            fields = result.extracted_fields.len(),
            "extracted certificate fields"
        );
        Ok(result)
    }
}

/// Project a raw model answer onto `schema`.
fn reshape(schema: &CertificateTypeSchema, raw: RawExtraction) -> FieldExtractionResult {
    for extra in raw.extracted_fields.keys().filter(|k| schema.field(k).is_none()) {
        debug!(field = %extra, "dropping field not in schema");
    }

    let mut extracted: ExtractedFields = schema
        .fields
        .iter()
        .map(|spec| {
            let value = raw
                .extracted_fields
                .get(&spec.name)
                .and_then(|v| field_value(spec, v))
                .map(|v| normalize_value(spec, v));
            (spec.name.clone(), value)
        })
        .collect();

    derive_missing(schema, &mut extracted);

    let field_confidence: BTreeMap<String, f32> = raw
        .field_confidence
        .iter()
        .filter(|(name, _)| matches!(extracted.get(name.as_str()), Some(Some(_))))
        .filter_map(|(name, c)| c.map(|c| (name.clone(), c.clamp(0.0, 1.0) as f32)))
        .collect();

    let mut missing_required: Vec<String> = Vec::new();
    for name in raw.missing_required {
        if schema.field(&name).is_some() && !missing_required.contains(&name) {
            missing_required.push(name);
        }
    }

    FieldExtractionResult {
        extracted_fields: extracted,
        field_confidence,
        missing_required,
    }
}

/// JSON value → field value. Null, blank strings and structured values
/// carry no usable evidence.
fn field_value(spec: &FieldSpec, value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| FieldValue::Text(s.to_string()))
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldValue::Integer(i)),
            None => n.as_f64().map(FieldValue::Decimal),
        },
        Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
        Value::Array(_) | Value::Object(_) => {
            warn!(field = %spec.name, "ignoring structured value for scalar field");
            None
        }
    }
}

fn normalize_value(spec: &FieldSpec, value: FieldValue) -> FieldValue {
    match (spec.kind, value) {
        (FieldKind::Date, FieldValue::Text(s)) => match parse_certificate_date(&s) {
            Some(date) => FieldValue::Text(iso(date)),
            None => FieldValue::Text(s),
        },
        (FieldKind::Number, value) => match value.as_i64() {
            Some(n) => FieldValue::Integer(n),
            None => value,
        },
        (FieldKind::Select, FieldValue::Text(s)) => {
            match spec.options.iter().find(|o| o.eq_ignore_ascii_case(s.trim())) {
                Some(option) => FieldValue::Text(option.clone()),
                None => FieldValue::Text(s),
            }
        }
        (_, value) => value,
    }
}

/// Fill duration and academic year from the dates when the model did not.
fn derive_missing(schema: &CertificateTypeSchema, fields: &mut ExtractedFields) {
    let start = date_of(fields, START_DATE_FIELD);
    let end = date_of(fields, END_DATE_FIELD);

    if schema.field(DURATION_FIELD).is_some() && is_empty(fields, DURATION_FIELD) {
        if let Some(days) = start.zip(end).and_then(|(s, e)| inclusive_days(s, e)) {
            debug!(days, "derived duration from dates");
            fields.insert(DURATION_FIELD.to_string(), Some(FieldValue::Integer(days)));
        }
    }

    if schema.field(ACADEMIC_YEAR_FIELD).is_some() && is_empty(fields, ACADEMIC_YEAR_FIELD) {
        let primary = start.or(end).or_else(|| first_date(schema, fields));
        if let Some(date) = primary {
            let year = academic_year(date);
            debug!(academic_year = %year, "derived academic year from date");
            fields.insert(ACADEMIC_YEAR_FIELD.to_string(), Some(FieldValue::Text(year)));
        }
    }
}

fn date_of(fields: &ExtractedFields, name: &str) -> Option<NaiveDate> {
    fields
        .get(name)
        .and_then(Option::as_ref)
        .and_then(FieldValue::as_text)
        .and_then(parse_certificate_date)
}

/// First parseable value among the schema's date fields.
fn first_date(schema: &CertificateTypeSchema, fields: &ExtractedFields) -> Option<NaiveDate> {
    schema
        .fields
        .iter()
        .filter(|f| f.kind == FieldKind::Date)
        .find_map(|f| date_of(fields, &f.name))
}

fn is_empty(fields: &ExtractedFields, name: &str) -> bool {
    !matches!(fields.get(name), Some(Some(_)))
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
