//! Error types for the facade.

use modelframe_arrow::EvalError;
use modelframe_formula::FormulaError;

/// Errors produced by [`ModelFrame`](crate::ModelFrame).
#[derive(Debug, thiserror::Error)]
pub enum ModelFrameError {
    /// The formula failed to parse or bind.
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// A batch could not be described or evaluated.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Evaluation of one partition failed.
    #[error("partition {index} failed: {source}")]
    Partition {
        index: usize,
        #[source]
        source: EvalError,
    },
}
