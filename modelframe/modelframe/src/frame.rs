//! Bind once, evaluate many times.

use std::sync::Arc;

use arrow::datatypes::Schema as ArrowSchema;
use arrow::record_batch::RecordBatch;
use modelframe_arrow::{Evaluation, evaluate, schema_from_record_batch, schema_to_arrow_schema};
use modelframe_core::Schema;
use modelframe_formula::{BoundFormula, Formula};
use rayon::prelude::*;

use crate::error::ModelFrameError;

/// A formula bound to a schema, ready to evaluate against record batches that
/// share that schema.
///
/// Cloning is cheap; clones share one [`BoundFormula`].
#[derive(Debug, Clone)]
pub struct ModelFrame {
    bound: Arc<BoundFormula>,
}

impl ModelFrame {
    /// Bind an already built `formula` to `schema`.
    pub fn new(formula: &Formula, schema: &Schema) -> Result<Self, ModelFrameError> {
        Ok(Self {
            bound: Arc::new(formula.bind(schema)?),
        })
    }

    /// Parse `text` and bind it to `schema`.
    pub fn parse(text: &str, schema: &Schema) -> Result<Self, ModelFrameError> {
        Self::new(&Formula::parse(text)?, schema)
    }

    /// Parse `text` and bind it to the schema of `batch`.
    ///
    /// Only dictionary-encoded string columns are treated as categorical; see
    /// [`schema_from_record_batch`].
    pub fn from_record_batch(text: &str, batch: &RecordBatch) -> Result<Self, ModelFrameError> {
        let schema = schema_from_record_batch(batch)?;
        Self::parse(text, &schema)
    }

    pub fn bound(&self) -> &BoundFormula {
        &self.bound
    }

    /// Shared handle to the bound formula.
    pub fn shared(&self) -> Arc<BoundFormula> {
        Arc::clone(&self.bound)
    }

    pub fn output_schema(&self) -> &Schema {
        self.bound.output_schema()
    }

    /// Arrow schema of the batches produced by [`Evaluation::frame`].
    pub fn arrow_schema(&self) -> ArrowSchema {
        schema_to_arrow_schema(self.bound.output_schema())
    }

    pub fn evaluate(&self, batch: &RecordBatch) -> Result<Evaluation<'_>, ModelFrameError> {
        Ok(evaluate(&self.bound, batch)?)
    }

    /// Evaluate every batch in parallel. Results keep the input order; the
    /// first failing partition (by index) is reported.
    pub fn evaluate_partitions(
        &self,
        batches: &[RecordBatch],
    ) -> Result<Vec<Evaluation<'_>>, ModelFrameError> {
        log::debug!(
            "evaluating '{}' over {} partition(s)",
            self.bound.formula(),
            batches.len()
        );
        let results: Vec<_> = batches
            .par_iter()
            .map(|batch| evaluate(&self.bound, batch))
            .collect();
        results
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.map_err(|source| ModelFrameError::Partition { index, source })
            })
            .collect()
    }
}
