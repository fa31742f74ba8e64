//! Ordered, typed field lists.

mod format;
mod types;

pub use format::format_schema;
pub use types::{DataTypeDef, FieldDef, Schema};
