//! Arrow-independent schema types for `modelframe`.
//!
//! A [`Schema`] is an ordered list of uniquely named [`FieldDef`]s. Formulas are
//! bound against a `Schema`, and bound formulas describe their output as a
//! `Schema` too, so this crate sits below both the formula and the Arrow layers.

mod error;
mod schema;

pub use error::SchemaError;
pub use schema::{DataTypeDef, FieldDef, Schema, format_schema};
