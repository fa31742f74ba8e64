mod commands;
mod fields;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{columns::ColumnsArgs, expand::ExpandArgs, schema::SchemaArgs};

#[derive(Parser)]
#[command(name = "mframe", about = "Inspect model formulas bound against a schema")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the formula with `.` and crossings expanded
    Expand(ExpandArgs),
    /// Print the output schema of the bound formula
    Schema(SchemaArgs),
    /// Print the design matrix column names
    Columns(ColumnsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Expand(args) => args.run(),
        Commands::Schema(args) => args.run(),
        Commands::Columns(args) => args.run(),
    }
}
