use anyhow::Result;
use clap::Args;
use modelframe::formula::Formula;

use crate::fields::FormulaInput;

#[derive(Args)]
pub struct ExpandArgs {
    #[command(flatten)]
    input: FormulaInput,
}

impl ExpandArgs {
    pub fn run(self) -> Result<()> {
        let schema = self.input.schema()?;
        let expanded = Formula::parse(&self.input.formula)?.expand(&schema)?;
        self.input.emit(&expanded.to_string())
    }
}
