pub mod columns;
pub mod expand;
pub mod schema;
