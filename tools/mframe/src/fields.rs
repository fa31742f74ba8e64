use std::{fs, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, anyhow};
use clap::Args;
use modelframe::core::{DataTypeDef, FieldDef, Schema};

/// Schema and formula shared by every command.
#[derive(Args)]
pub struct FormulaInput {
    /// Formula text, e.g. "y ~ . + log(x)"
    pub formula: String,

    /// Column declaration `name:type`, repeated in schema order
    /// (types: bool, i8, i16, i32, i64, f32, f64, string, categorical[a,b,...])
    #[arg(short, long = "field", value_parser = parse_field, required = true)]
    pub fields: Vec<FieldDef>,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl FormulaInput {
    pub fn schema(&self) -> Result<Schema> {
        Schema::new(self.fields.clone()).context("invalid schema")
    }

    /// Writes `text` ending in exactly one newline.
    pub fn emit(&self, text: &str) -> Result<()> {
        let text = text.trim_end_matches('\n');
        match &self.output {
            Some(path) => fs::write(path, format!("{text}\n"))?,
            None => println!("{text}"),
        }
        Ok(())
    }
}

fn parse_field(raw: &str) -> Result<FieldDef> {
    let (name, ty) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("expected name:type, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("empty field name in '{raw}'"));
    }
    Ok(FieldDef::new(name, DataTypeDef::from_str(ty)?))
}
