//! Evaluation of a [`BoundFormula`] against one Arrow [`RecordBatch`].
//!
//! Source columns are decoded once in [`evaluate`]; `y`, `x` and `frame` then
//! compute each output cell independently, so rows are split across the rayon
//! pool without changing any result.

mod source;

use std::{collections::BTreeSet, sync::Arc};

use arrow::array::{ArrayRef, DictionaryArray, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{Field, Int32Type, Schema as ArrowSchema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use modelframe_core::FieldDef;
use modelframe_formula::{BoundFormula, Operand, PlanExpr, PlanKind, TermPlan};
use rayon::prelude::*;

use crate::{
    encoding::CategoricalEncoding, error::EvalError, matrix::DesignMatrix,
    schema_convert::field_def_to_arrow_field,
};
use source::{SourceColumn, mismatch};

/// Name of the constant column `x` prepends when the formula has an intercept.
pub const INTERCEPT_COLUMN: &str = "Intercept";

/// Checks `batch` against the bind-time schema and decodes the columns the plan
/// reads.
///
/// # Errors
///
/// [`EvalError::SchemaMismatch`] when a column read by the plan is missing
/// from `batch` or has an incompatible type.
pub fn evaluate<'a>(
    bound: &'a BoundFormula,
    batch: &RecordBatch,
) -> Result<Evaluation<'a>, EvalError> {
    let input = bound.input_schema();
    let used: BTreeSet<usize> = plans(bound)
        .flat_map(|p| p.source_indices().iter().copied())
        .collect();

    let decoded: Vec<Result<(usize, SourceColumn), EvalError>> = used
        .par_iter()
        .map(|&index| -> Result<(usize, SourceColumn), EvalError> {
            let field = &input[index];
            let array = batch
                .column_by_name(&field.name)
                .ok_or_else(|| mismatch(field, "no such column".to_string()))?;
            Ok((index, SourceColumn::decode(field, array)?))
        })
        .collect();

    let mut sources: Vec<Option<SourceColumn>> = (0..input.len()).map(|_| None).collect();
    for result in decoded {
        let (index, column) = result?;
        sources[index] = Some(column);
    }

    log::debug!(
        "evaluating '{}' over {} row(s) reading {} column(s)",
        bound.formula(),
        batch.num_rows(),
        used.len()
    );

    Ok(Evaluation {
        bound,
        num_rows: batch.num_rows(),
        sources,
    })
}

/// Response and predictor plans in output order. A re-added response is
/// yielded once.
fn plans(bound: &BoundFormula) -> impl Iterator<Item = &TermPlan> {
    let response = bound.response();
    response.into_iter().chain(
        bound
            .predictors()
            .iter()
            .filter(move |p| response.is_none_or(|r| r.term() != p.term())),
    )
}

/// A bound formula applied to one batch. Borrows the formula, owns the decoded
/// input columns.
pub struct Evaluation<'a> {
    bound: &'a BoundFormula,
    num_rows: usize,
    sources: Vec<Option<SourceColumn>>,
}

/// One column of the design matrix.
enum DesignColumn<'p> {
    Intercept,
    Numeric(&'p PlanExpr),
    Code {
        column: usize,
    },
    Indicator {
        column: usize,
        level: u32,
    },
    Interaction {
        operands: &'p [Operand],
        combination: &'p [usize],
    },
}

impl<'a> Evaluation<'a> {
    pub fn bound(&self) -> &'a BoundFormula {
        self.bound
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// The response as an Arrow array.
    ///
    /// A numeric column comes back as it was passed in, a function of one as
    /// `Float64`, and a categorical column as `Int32` level codes in declared
    /// level order (null where the label is missing or unknown).
    pub fn y(&self) -> Result<ArrayRef, EvalError> {
        let plan = self.bound.response().ok_or(EvalError::NoResponse)?;
        match plan.kind() {
            PlanKind::Numeric(PlanExpr::Column(index)) => match &self.sources[*index] {
                Some(SourceColumn::Numeric { array, .. }) => Ok(array.clone()),
                _ => Ok(self.float_column(&DesignColumn::Numeric(&PlanExpr::Column(
                    *index,
                )))),
            },
            PlanKind::Numeric(expr) => Ok(self.float_column(&DesignColumn::Numeric(expr))),
            PlanKind::Categorical { column, .. } => Ok(Arc::new(self.codes(*column)) as ArrayRef),
            PlanKind::FactorInteraction { .. } => {
                Err(EvalError::UnsupportedResponse(plan.term().to_string()))
            }
        }
    }

    /// The predictors as a row-major design matrix.
    ///
    /// The intercept, when present, is the first column. Categorical main
    /// effects are expanded per `encoding`; everything else produces exactly
    /// its output-schema columns. Missing inputs give NaN.
    pub fn x(&self, encoding: CategoricalEncoding) -> DesignMatrix {
        let (names, columns): (Vec<String>, Vec<DesignColumn<'a>>) =
            self.design_columns(encoding).into_iter().unzip();
        let ncols = columns.len();
        let mut data = vec![0.0; self.num_rows * ncols];
        if ncols > 0 {
            data.par_chunks_mut(ncols)
                .enumerate()
                .for_each(|(row, out)| {
                    for (cell, column) in out.iter_mut().zip(&columns) {
                        *cell = self.cell(column, row);
                    }
                });
        }
        log::trace!("design matrix: {} x {}", self.num_rows, ncols);
        DesignMatrix::new(names, self.num_rows, data)
    }

    /// A new batch with exactly the output-schema columns, in order.
    ///
    /// Numeric variables are passed through, categoricals are
    /// `Dictionary(Int32, Utf8)` over the declared levels, and computed
    /// columns are `Float64`.
    pub fn frame(&self) -> Result<RecordBatch, EvalError> {
        let mut collector = Collector::default();
        for plan in plans(self.bound) {
            let outputs = plan.outputs();
            match plan.kind() {
                PlanKind::Numeric(PlanExpr::Column(index)) => {
                    let array = match &self.sources[*index] {
                        Some(SourceColumn::Numeric { array, .. }) => array.clone(),
                        _ => self.float_column(&DesignColumn::Numeric(&PlanExpr::Column(
                            *index,
                        ))),
                    };
                    collector.push_all(outputs, [array]);
                }
                PlanKind::Numeric(expr) => {
                    let array = self.float_column(&DesignColumn::Numeric(expr));
                    collector.push_all(outputs, [array]);
                }
                PlanKind::Categorical { column, levels } => {
                    let values = StringArray::from_iter_values(levels);
                    let dictionary = DictionaryArray::<Int32Type>::try_new(
                        self.codes(*column),
                        Arc::new(values),
                    )?;
                    collector.push_all(outputs, [Arc::new(dictionary) as ArrayRef]);
                }
                PlanKind::FactorInteraction {
                    operands,
                    combinations,
                } => {
                    let arrays = combinations.iter().map(|combination| {
                        self.float_column(&DesignColumn::Interaction {
                            operands,
                            combination,
                        })
                    });
                    collector.push_all(outputs, arrays);
                }
            }
        }

        let schema = Arc::new(ArrowSchema::new(collector.fields));
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows));
        Ok(RecordBatch::try_new_with_options(
            schema,
            collector.arrays,
            &options,
        )?)
    }

    fn design_columns(&self, encoding: CategoricalEncoding) -> Vec<(String, DesignColumn<'a>)> {
        let mut columns = Vec::new();
        if self.bound.has_intercept() {
            columns.push((INTERCEPT_COLUMN.to_string(), DesignColumn::Intercept));
        }
        for plan in self.bound.predictors() {
            let outputs = plan.outputs();
            match plan.kind() {
                PlanKind::Numeric(expr) => {
                    columns.extend(
                        outputs
                            .iter()
                            .map(|f| (f.name.clone(), DesignColumn::Numeric(expr))),
                    );
                }
                PlanKind::Categorical { column, levels } => {
                    let name = outputs.first().map_or("", |f| f.name.as_str());
                    let column = *column;
                    match encoding {
                        CategoricalEncoding::Ordinal => {
                            columns.push((name.to_string(), DesignColumn::Code { column }));
                        }
                        CategoricalEncoding::OneHot | CategoricalEncoding::Dummy => {
                            let skip = levels.len() - encoding.width(levels.len());
                            columns.extend(levels.iter().zip(0u32..).skip(skip).map(
                                |(level_name, level)| {
                                    (
                                        format!("{name}_{level_name}"),
                                        DesignColumn::Indicator { column, level },
                                    )
                                },
                            ));
                        }
                    }
                }
                PlanKind::FactorInteraction {
                    operands,
                    combinations,
                } => {
                    columns.extend(outputs.iter().zip(combinations).map(|(f, combination)| {
                        (
                            f.name.clone(),
                            DesignColumn::Interaction {
                                operands,
                                combination,
                            },
                        )
                    }));
                }
            }
        }
        columns
    }

    fn cell(&self, column: &DesignColumn<'_>, row: usize) -> f64 {
        match column {
            DesignColumn::Intercept => 1.0,
            DesignColumn::Numeric(expr) => self.numeric(expr, row),
            DesignColumn::Code { column } => {
                self.code(*column, row).map_or(f64::NAN, f64::from)
            }
            DesignColumn::Indicator { column, level } => match self.code(*column, row) {
                Some(code) => indicator(code == *level),
                None => f64::NAN,
            },
            DesignColumn::Interaction {
                operands,
                combination,
            } => {
                let mut levels = combination.iter();
                operands
                    .iter()
                    .map(|operand| match operand {
                        Operand::Numeric(expr) => self.numeric(expr, row),
                        Operand::Factor { column, .. } => {
                            match (self.code(*column, row), levels.next()) {
                                (Some(code), Some(&level)) => indicator(code as usize == level),
                                _ => f64::NAN,
                            }
                        }
                    })
                    .product()
            }
        }
    }

    fn numeric(&self, expr: &PlanExpr, row: usize) -> f64 {
        expr.eval(&|index| match &self.sources[index] {
            Some(SourceColumn::Numeric { values, .. }) => values[row],
            _ => f64::NAN,
        })
    }

    fn code(&self, column: usize, row: usize) -> Option<u32> {
        match &self.sources[column] {
            Some(SourceColumn::Factor { codes }) => codes[row],
            _ => None,
        }
    }

    fn codes(&self, column: usize) -> Int32Array {
        (0..self.num_rows)
            .map(|row| self.code(column, row).and_then(|c| i32::try_from(c).ok()))
            .collect()
    }

    fn float_column(&self, column: &DesignColumn<'_>) -> ArrayRef {
        let values: Vec<f64> = (0..self.num_rows)
            .into_par_iter()
            .map(|row| self.cell(column, row))
            .collect();
        Arc::new(Float64Array::from(values))
    }
}

fn indicator(hit: bool) -> f64 {
    if hit { 1.0 } else { 0.0 }
}

/// Accumulates the columns of [`Evaluation::frame`].
#[derive(Default)]
struct Collector {
    fields: Vec<Field>,
    arrays: Vec<ArrayRef>,
}

impl Collector {
    fn push_all(&mut self, outputs: &[FieldDef], arrays: impl IntoIterator<Item = ArrayRef>) {
        for (def, array) in outputs.iter().zip(arrays) {
            self.fields.push(field_def_to_arrow_field(def));
            self.arrays.push(array);
        }
    }
}
