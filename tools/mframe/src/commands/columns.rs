use std::sync::Arc;

use anyhow::Result;
use arrow::record_batch::RecordBatch;
use clap::Args;
use modelframe::{
    ModelFrame,
    arrow::{CategoricalEncoding, schema_to_arrow_schema},
};

use crate::fields::FormulaInput;

#[derive(Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    input: FormulaInput,

    /// Categorical encoding: ordinal | one-hot | dummy
    #[arg(short, long, default_value_t = CategoricalEncoding::Dummy)]
    encoding: CategoricalEncoding,
}

impl ColumnsArgs {
    pub fn run(self) -> Result<()> {
        let schema = self.input.schema()?;
        let frame = ModelFrame::parse(&self.input.formula, &schema)?;
        let empty = RecordBatch::new_empty(Arc::new(schema_to_arrow_schema(&schema)));
        let x = frame.evaluate(&empty)?.x(self.encoding);
        self.input.emit(&x.names().join("\n"))
    }
}
