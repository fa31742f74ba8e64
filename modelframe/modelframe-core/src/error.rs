//! Error types for schema construction.

/// Error returned when a [`Schema`](crate::Schema) or a data type cannot be built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Two fields share the same name.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),

    /// A categorical field declares no levels.
    #[error("categorical field '{field}' has no levels")]
    EmptyLevels { field: String },

    /// A categorical field declares the same level twice.
    #[error("categorical field '{field}' repeats level '{level}'")]
    DuplicateLevel { field: String, level: String },

    /// A textual type name could not be parsed.
    #[error("unknown data type '{0}'")]
    UnknownType(String),
}
