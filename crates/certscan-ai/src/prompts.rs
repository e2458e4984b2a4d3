//! Prompt construction for both passes.

use std::fmt::Write as _;

use certscan_core::{CertificateTypeSchema, SchemaRegistry, UNKNOWN_TYPE, truncate_chars};

/// Characters of OCR text shown to the classifier. The opening of a
/// certificate carries its type; the body is not needed.
pub const CLASSIFICATION_CHAR_BUDGET: usize = 3000;

// ── Pass 1: classification ──

const CLASSIFY_INSTRUCTIONS: &str = "\
You are classifying an academic certificate uploaded by a faculty member.

Decide which ONE of the categories below the certificate belongs to. Use the \
keyword guidance, but judge by the overall purpose of the document. If none \
of the categories fits, answer UNKNOWN.";

const CLASSIFY_OUTPUT: &str = "\
Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"detected_type\": \"one of the category keys above, or UNKNOWN\",
  \"confidence\": a number between 0 and 1,
  \"reason\": \"one short sentence explaining the decision\"
}";

pub fn classification_prompt(registry: &SchemaRegistry, text: &str, char_budget: usize) -> String {
    let mut categories = String::new();
    for schema in registry.iter() {
        let _ = writeln!(
            categories,
            "- {key}: {name}. {description} Keywords: {keywords}.",
            key = schema.type_key,
            name = schema.display_name,
            description = schema.description,
            keywords = schema.keywords.join(", "),
        );
    }
    let _ = writeln!(
        categories,
        "- {UNKNOWN_TYPE}: none of the above, or not a certificate."
    );

    format!(
        "{CLASSIFY_INSTRUCTIONS}\n\
         \n\
         Categories:\n\
         {categories}\
         \n\
         Certificate text:\n\
         \"\"\"\n\
         {text}\n\
         \"\"\"\n\
         \n\
         {CLASSIFY_OUTPUT}",
        text = truncate_chars(text, char_budget),
    )
}

// ── Pass 2: field extraction ──

const EXTRACTION_RULES: &str = "\
Rules:
1. Person name: prefer the name following phrasing such as \"This is to certify that\" \
or \"Presented to\", or the most visually prominent name on the certificate.
2. Academic year: derive it from any extracted date. A date on or after 1 July of \
year Y belongs to academic year \"Y-(Y+1 mod 100)\" (for example 2024-07-15 is \"2024-25\"); \
a date before 1 July belongs to \"(Y-1)-(Y mod 100)\" (for example 2024-06-30 is \"2023-24\").
3. Dates: if a date range is present, the primary date is the START date. Output every \
date as YYYY-MM-DD.
4. Duration in days: compute it from the start and end dates when both are present, \
counting both days. If only a number of weeks is given, multiply it by 7.
5. Mode: answer Online or Offline, inferred from context such as platform names \
(Zoom, Google Meet, Swayam, NPTEL, Coursera) or an explicit venue or \"online\" text.
6. Any field with no textual evidence on the certificate MUST be null. Do not guess.";

pub fn extraction_prompt(schema: &CertificateTypeSchema, text: &str) -> String {
    let mut fields = String::new();
    for field in &schema.fields {
        let _ = write!(
            fields,
            "- {name} ({label}, {kind}",
            name = field.name,
            label = field.label,
            kind = field.kind.as_str(),
        );
        if !field.options.is_empty() {
            let _ = write!(fields, ", one of: {}", field.options.join(" | "));
        }
        if field.required {
            fields.push_str(", required");
        }
        fields.push_str(")\n");
    }

    let names: Vec<&str> = schema.field_names().collect();

    format!(
        "You are extracting data from a {display} certificate ({key}).\n\
         \n\
         Certificate text:\n\
         \"\"\"\n\
         {text}\n\
         \"\"\"\n\
         \n\
         Fields to extract:\n\
         {fields}\
         \n\
         {EXTRACTION_RULES}\n\
         \n\
         Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:\n\
         {{\n\
         \x20 \"extracted_fields\": {{ one key per field: {names} }},\n\
         \x20 \"field_confidence\": {{ field name: number between 0 and 1, for non-null fields }},\n\
         \x20 \"missing_required\": [ names of required fields you could not find ]\n\
         }}",
        display = schema.display_name,
        key = schema.type_key,
        names = names.join(", "),
    )
}
