//! Certificate type registry.
//!
//! Each registered type describes one document category the pipeline can
//! recognise: the labels shown in prompts and the UI, the destination table,
//! and the ordered list of fields extracted for it. The registry is built once
//! at startup and shared read-only (`Arc<SchemaRegistry>`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::UNKNOWN_TYPE;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry has no certificate types")]
    Empty,

    #[error("certificate type with empty key")]
    EmptyTypeKey,

    #[error("type key {0:?} is reserved")]
    ReservedTypeKey(String),

    #[error("duplicate certificate type {0:?}")]
    DuplicateType(String),

    #[error("certificate type {0:?} has no fields")]
    NoFields(String),

    #[error("duplicate field {field:?} in certificate type {type_key:?}")]
    DuplicateField { type_key: String, field: String },

    #[error("select field {field:?} in certificate type {type_key:?} has no options")]
    SelectWithoutOptions { type_key: String, field: String },
}

/// Value type of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    /// ISO `YYYY-MM-DD`.
    Date,
    Number,
    /// One of the field's `options`.
    Select,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Number => "number",
            Self::Select => "select",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    fn new(name: &str, label: &str, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            options: Vec::new(),
            required,
        }
    }

    fn select(name: &str, label: &str, options: &[&str], required: bool) -> Self {
        Self {
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Self::new(name, label, FieldKind::Select, required)
        }
    }
}

/// One recognised document category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateTypeSchema {
    pub type_key: String,
    pub display_name: String,
    pub description: String,
    /// Distinguishing phrases given to the classifier as guidance.
    #[serde(default)]
    pub keywords: Vec<String>,
    pub storage_table: String,
    pub section_code: String,
    pub fields: Vec<FieldSpec>,
}

impl CertificateTypeSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

/// Immutable mapping from type key to schema, in registration order.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: Vec<CertificateTypeSchema>,
}

impl SchemaRegistry {
    /// Build a registry, rejecting duplicate or reserved keys and malformed fields.
    pub fn new(schemas: Vec<CertificateTypeSchema>) -> Result<Self, RegistryError> {
        if schemas.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen_types = HashSet::new();
        for schema in &schemas {
            let key = schema.type_key.as_str();
            if key.trim().is_empty() {
                return Err(RegistryError::EmptyTypeKey);
            }
            if key.eq_ignore_ascii_case(UNKNOWN_TYPE) {
                return Err(RegistryError::ReservedTypeKey(key.to_string()));
            }
            if !seen_types.insert(key) {
                return Err(RegistryError::DuplicateType(key.to_string()));
            }
            if schema.fields.is_empty() {
                return Err(RegistryError::NoFields(key.to_string()));
            }

            let mut seen_fields = HashSet::new();
            for field in &schema.fields {
                if !seen_fields.insert(field.name.as_str()) {
                    return Err(RegistryError::DuplicateField {
                        type_key: key.to_string(),
                        field: field.name.clone(),
                    });
                }
                if field.kind == FieldKind::Select && field.options.is_empty() {
                    return Err(RegistryError::SelectWithoutOptions {
                        type_key: key.to_string(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        Ok(Self { schemas })
    }

    /// Parse a JSON array of schemas.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let schemas: Vec<CertificateTypeSchema> = serde_json::from_str(json)?;
        Self::new(schemas)
    }

    /// Load a JSON array of schemas from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            types = registry.len(),
            "loaded certificate schemas"
        );
        Ok(registry)
    }

    /// The four certificate categories the portal accepts.
    pub fn builtin() -> Self {
        Self {
            schemas: builtin_schemas(),
        }
    }

    /// Exact lookup by type key.
    pub fn get(&self, type_key: &str) -> Option<&CertificateTypeSchema> {
        self.schemas.iter().find(|s| s.type_key == type_key)
    }

    /// Case-insensitive lookup, returning the canonical schema.
    pub fn resolve(&self, candidate: &str) -> Option<&CertificateTypeSchema> {
        let candidate = candidate.trim();
        self.schemas
            .iter()
            .find(|s| s.type_key.eq_ignore_ascii_case(candidate))
    }

    /// Schemas in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CertificateTypeSchema> {
        self.schemas.iter()
    }

    pub fn type_keys(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.type_key.as_str())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

const MODES: &[&str] = &["Online", "Offline"];

fn builtin_schemas() -> Vec<CertificateTypeSchema> {
    use FieldKind::{Date, Number, Text};

    vec![
        CertificateTypeSchema {
            type_key: "FDP".into(),
            display_name: "Faculty Development Program".into(),
            description: "Attendance or participation in a faculty development program, \
                          short-term training program, or workshop series for teachers."
                .into(),
            keywords: vec![
                "Faculty Development Program".into(),
                "FDP".into(),
                "Short Term Training Program".into(),
                "STTP".into(),
                "certificate of participation".into(),
            ],
            storage_table: "fdp_attended".into(),
            section_code: "3.4.1".into(),
            fields: vec![
                FieldSpec::new("faculty_name", "Faculty name", Text, true),
                FieldSpec::new("program_title", "Program title", Text, true),
                FieldSpec::new("organizer", "Organized by", Text, true),
                FieldSpec::new("start_date", "Start date", Date, true),
                FieldSpec::new("end_date", "End date", Date, false),
                FieldSpec::new("duration_days", "Duration (days)", Number, false),
                FieldSpec::select("mode", "Mode", MODES, false),
                FieldSpec::new("academic_year", "Academic year", Text, true),
            ],
        },
        CertificateTypeSchema {
            type_key: "MOOC".into(),
            display_name: "MOOC Certification".into(),
            description: "Completion of an online course on a MOOC platform such as \
                          NPTEL, SWAYAM, Coursera, or edX."
                .into(),
            keywords: vec![
                "NPTEL".into(),
                "SWAYAM".into(),
                "Coursera".into(),
                "edX".into(),
                "successfully completed".into(),
                "online course".into(),
            ],
            storage_table: "mooc_certifications".into(),
            section_code: "3.4.2".into(),
            fields: vec![
                FieldSpec::new("faculty_name", "Faculty name", Text, true),
                FieldSpec::new("course_title", "Course title", Text, true),
                FieldSpec::new("platform", "Platform", Text, true),
                FieldSpec::new("start_date", "Start date", Date, false),
                FieldSpec::new("end_date", "End date", Date, false),
                FieldSpec::new("duration_days", "Duration (days)", Number, false),
                FieldSpec::new("grade", "Grade / score", Text, false),
                FieldSpec::new("academic_year", "Academic year", Text, true),
            ],
        },
        CertificateTypeSchema {
            type_key: "MEMBERSHIP".into(),
            display_name: "Professional Society Membership".into(),
            description: "Membership certificate or card issued by a professional body \
                          such as IEEE, ACM, ISTE, CSI, or IE(I)."
                .into(),
            keywords: vec![
                "member".into(),
                "membership".into(),
                "life member".into(),
                "membership number".into(),
                "society".into(),
            ],
            storage_table: "society_memberships".into(),
            section_code: "3.5.1".into(),
            fields: vec![
                FieldSpec::new("faculty_name", "Member name", Text, true),
                FieldSpec::new("society_name", "Society", Text, true),
                FieldSpec::select(
                    "membership_type",
                    "Membership type",
                    &["Life", "Annual", "Fellow", "Associate", "Student"],
                    false,
                ),
                FieldSpec::new("membership_id", "Membership number", Text, false),
                FieldSpec::new("start_date", "Member since", Date, false),
                FieldSpec::new("valid_until", "Valid until", Date, false),
                FieldSpec::new("academic_year", "Academic year", Text, true),
            ],
        },
        CertificateTypeSchema {
            type_key: "RESOURCE_PERSON".into(),
            display_name: "Resource Person".into(),
            description: "Invitation or appreciation for delivering a talk, session, or \
                          keynote as a resource person, speaker, or chief guest."
                .into(),
            keywords: vec![
                "resource person".into(),
                "expert lecture".into(),
                "guest lecture".into(),
                "keynote".into(),
                "certificate of appreciation".into(),
                "delivered a talk".into(),
            ],
            storage_table: "resource_person_roles".into(),
            section_code: "3.4.3".into(),
            fields: vec![
                FieldSpec::new("faculty_name", "Faculty name", Text, true),
                FieldSpec::new("event_title", "Event title", Text, true),
                FieldSpec::new("topic", "Session topic", Text, false),
                FieldSpec::new("organizer", "Organized by", Text, true),
                FieldSpec::new("start_date", "Date", Date, true),
                FieldSpec::select("mode", "Mode", MODES, false),
                FieldSpec::new("academic_year", "Academic year", Text, true),
            ],
        },
    ]
}
