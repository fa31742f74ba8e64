use std::fmt::{Error, Write as _};

use super::{DataTypeDef, FieldDef};

/// Format fields one per line:
/// `name: { type: f64 }`, with categorical fields listing their levels.
pub fn format_schema(fields: impl AsRef<[FieldDef]>) -> Result<String, Error> {
    let mut out = String::new();
    for field in fields.as_ref() {
        format_field(field, &mut out)?;
    }
    Ok(out)
}

fn format_field(field: &FieldDef, out: &mut String) -> std::fmt::Result {
    match &field.data_type {
        DataTypeDef::Categorical(levels) => writeln!(
            out,
            "{}: {{ type: {}, levels: [{}] }}",
            field.name,
            field.data_type.type_name(),
            levels.join(", ")
        ),
        other => writeln!(out, "{}: {{ type: {} }}", field.name, other.type_name()),
    }
}
