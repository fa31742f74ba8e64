//! Arrow integration layer for `modelframe`.
//!
//! This crate has two responsibilities:
//! 1. Convert between `modelframe-core` schemas and Arrow schemas/batches.
//! 2. Evaluate a [`BoundFormula`](modelframe_formula::BoundFormula) against a
//!    `RecordBatch`, producing the response array, the design matrix, or a
//!    model frame.
//!
//! # Typical Flow
//! ```rust
//! use std::sync::Arc;
//!
//! use arrow::array::{ArrayRef, Float64Array};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use modelframe_arrow::{CategoricalEncoding, evaluate, schema_from_record_batch};
//! use modelframe_formula::parse_formula;
//!
//! let batch = RecordBatch::try_new(
//!     Arc::new(Schema::new(vec![
//!         Field::new("y", DataType::Float64, false),
//!         Field::new("x", DataType::Float64, false),
//!     ])),
//!     vec![
//!         Arc::new(Float64Array::from(vec![1.0, 2.0])) as ArrayRef,
//!         Arc::new(Float64Array::from(vec![3.0, 4.0])) as ArrayRef,
//!     ],
//! )
//! .unwrap();
//! let schema = schema_from_record_batch(&batch).unwrap();
//! let bound = parse_formula("y ~ 1 + log(x)").unwrap().bind(&schema).unwrap();
//! let x = evaluate(&bound, &batch).unwrap().x(CategoricalEncoding::Dummy);
//! assert_eq!(x.names(), &["Intercept", "log(x)"]);
//! ```
pub mod encoding;
pub mod error;
pub mod evaluate;
pub mod matrix;
pub mod schema_convert;

/// Re-export of [`encoding::CategoricalEncoding`].
pub use encoding::CategoricalEncoding;
/// Re-export of [`error::EvalError`].
pub use error::EvalError;
/// Re-exports from [`evaluate`].
pub use evaluate::{Evaluation, INTERCEPT_COLUMN, evaluate};
/// Re-export of [`matrix::DesignMatrix`].
pub use matrix::DesignMatrix;
/// Re-exports from [`schema_convert`].
pub use schema_convert::{data_type_to_arrow, schema_from_record_batch, schema_to_arrow_schema};
