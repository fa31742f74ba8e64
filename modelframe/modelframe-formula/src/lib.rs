//! Symbolic model formulas for `modelframe`.
//!
//! # Pipeline
//!
//! ```text
//! "y ~ a && b + log(c) - a"      builder: variable / function / interaction / crossing / dot
//!   └─ parse_formula  – nom-based parser → Formula (crossings expanded, set semantics)
//!       └─ bind       – resolve `.` against a Schema, validate, plan each term
//!           └─ BoundFormula  – output Schema + one TermPlan per term
//! ```
//!
//! A [`BoundFormula`] is immutable and can be evaluated against any table that
//! shares the bind-time schema; see `modelframe-arrow`.

mod bind;
mod error;
mod formula;
mod function;
mod parser;
mod term;

pub use bind::{BoundFormula, Operand, PlanExpr, PlanKind, TermPlan, bind};
pub use error::FormulaError;
pub use formula::Formula;
pub use function::MathFunction;
pub use parser::parse_formula;
pub use term::{Term, crossing, dot, function, intercept, interaction, variable};
