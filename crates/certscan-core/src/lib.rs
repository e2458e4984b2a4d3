pub mod dates;
pub mod model;
pub mod registry;
pub mod request;
pub mod text;

pub use dates::{academic_year, inclusive_days, parse_certificate_date};
pub use model::{
    ClassificationResult, ExtractedFields, FieldExtractionResult, FieldValue, OcrResult,
    OcrSource, ReconciledAnalysis, UNKNOWN_TYPE,
};
pub use registry::{CertificateTypeSchema, FieldKind, FieldSpec, RegistryError, SchemaRegistry};
pub use request::{
    DocumentSource, ExtractionRequest, SourceError, WireExtractionRequest, WireSource,
};
pub use text::{clean_text, truncate_chars};
