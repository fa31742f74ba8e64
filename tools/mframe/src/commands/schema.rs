use anyhow::Result;
use clap::Args;
use modelframe::ModelFrame;

use crate::fields::FormulaInput;

#[derive(Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    input: FormulaInput,
}

impl SchemaArgs {
    pub fn run(self) -> Result<()> {
        let schema = self.input.schema()?;
        let frame = ModelFrame::parse(&self.input.formula, &schema)?;
        let unused: Vec<&str> = schema
            .names()
            .filter(|name| {
                !frame
                    .bound()
                    .source_fields()
                    .iter()
                    .any(|f| f.name == *name)
            })
            .collect();
        if !unused.is_empty() {
            eprintln!("Warning: columns not used by the formula: {}", unused.join(", "));
        }
        self.input.emit(&frame.output_schema().to_string())
    }
}
