use arrow::error::ArrowError;
use modelframe_core::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// A column read by the plan is missing from the batch or has a different type.
    #[error("column '{column}' does not match the bound schema: expected {expected}, found {found}")]
    SchemaMismatch {
        column: String,
        expected: String,
        found: String,
    },
    #[error("formula has no response")]
    NoResponse,
    #[error("response '{0}' cannot be materialized as a single array")]
    UnsupportedResponse(String),
    #[error("column '{column}' has unsupported Arrow type {data_type}")]
    UnsupportedArrowType { column: String, data_type: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
}
