//! Error types for parsing and binding formulas.

use modelframe_core::SchemaError;

/// Errors raised while parsing or binding a [`Formula`](crate::Formula).
///
/// Every variant is raised at the stage that detects it; nothing is deferred to
/// evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    /// Malformed formula text. `position` is a byte offset into the input.
    #[error("failed to parse formula at offset {position}: {message}")]
    Parse { position: usize, message: String },

    /// A term references a column that is absent from the schema.
    #[error("column '{0}' not found in schema")]
    UnresolvedColumn(String),

    /// The response term is also listed as a predictor.
    #[error("response '{0}' also appears among the predictors")]
    DuplicateResponseInPredictors(String),

    /// A function name is not in the elementwise function table.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A term is structurally valid but cannot be bound where it appears.
    #[error("invalid term '{term}': {reason}")]
    InvalidTerm { term: String, reason: String },

    /// A referenced column has a type no term can consume.
    #[error("column '{name}' has unsupported type {data_type}")]
    UnsupportedColumnType { name: String, data_type: String },

    /// The output schema could not be assembled (e.g. two outputs share a name).
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl FormulaError {
    pub(crate) fn invalid_term(term: &crate::Term, reason: impl Into<String>) -> Self {
        FormulaError::InvalidTerm {
            term: term.to_string(),
            reason: reason.into(),
        }
    }
}
