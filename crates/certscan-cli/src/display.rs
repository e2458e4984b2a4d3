//! Human-readable listing of the registered certificate types.

use std::fmt::Write as _;

use certscan_core::{CertificateTypeSchema, SchemaRegistry};

pub fn render_types(registry: &SchemaRegistry) -> String {
    let mut out = String::new();
    for (i, schema) in registry.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_type(&mut out, schema);
    }
    out
}

fn render_type(out: &mut String, schema: &CertificateTypeSchema) {
    let _ = writeln!(
        out,
        "{} - {}  (table {}, section {})",
        schema.type_key, schema.display_name, schema.storage_table, schema.section_code
    );
    let _ = writeln!(out, "  {}", schema.description);
    if !schema.keywords.is_empty() {
        let _ = writeln!(out, "  Keywords: {}", schema.keywords.join(", "));
    }

    let width = schema
        .fields
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0);

    out.push_str("  Fields:\n");
    for field in &schema.fields {
        let required = if field.required { "required" } else { "" };
        let _ = write!(
            out,
            "    {:<width$}  {:<6}  {:<8}  {}",
            field.name,
            field.kind.as_str(),
            required,
            field.label,
        );
        if !field.options.is_empty() {
            let _ = write!(out, " [{}]", field.options.join(" | "));
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_type_with_its_table() {
        let registry = SchemaRegistry::builtin();
        let out = render_types(&registry);
        for schema in registry.iter() {
            assert!(out.contains(&format!("{} - {}", schema.type_key, schema.display_name)));
            assert!(out.contains(&format!("table {}", schema.storage_table)));
        }
    }

    #[test]
    fn select_options_are_shown() {
        let out = render_types(&SchemaRegistry::builtin());
        assert!(out.contains("[Online | Offline]"));
        assert!(out.contains("required"));
    }
}
