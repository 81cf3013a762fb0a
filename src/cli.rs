use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::report::ReportFormat;

#[derive(Debug, Parser)]
#[command(author, version, about = "Reconcile a target dataset against its source", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile source and target tables and write the validation report
    Validate(ValidateArgs),
    /// Compare inferred column types of source and target
    Schema(SchemaArgs),
    /// Print the primary key column detected for a table
    Key(KeyArgs),
}

#[derive(Debug, Args, Clone, Default)]
pub struct InputOptions {
    /// Field delimiter for CSV inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the source file (defaults to utf-8)
    #[arg(long = "source-encoding")]
    pub source_encoding: Option<String>,
    /// Character encoding of the target file (defaults to utf-8)
    #[arg(long = "target-encoding")]
    pub target_encoding: Option<String>,
    /// Worksheet to read from a source workbook (defaults to the first)
    #[arg(long = "source-sheet")]
    pub source_sheet: Option<String>,
    /// Worksheet to read from a target workbook (defaults to the first)
    #[arg(long = "target-sheet")]
    pub target_sheet: Option<String>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Source table (.csv, .tsv, .xlsx, .xls, .ods)
    #[arg(short, long)]
    pub source: PathBuf,
    /// Target table to check against the source
    #[arg(short, long)]
    pub target: PathBuf,
    /// Report destination; `.xlsx` writes a workbook, anything else a CSV directory
    #[arg(short, long)]
    pub output: PathBuf,
    /// Override the report format implied by the output path
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,
    /// Print the summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    #[command(flatten)]
    pub inputs: InputOptions,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Source table
    #[arg(short, long)]
    pub source: PathBuf,
    /// Target table
    #[arg(short, long)]
    pub target: PathBuf,
    #[command(flatten)]
    pub inputs: InputOptions,
}

#[derive(Debug, Args)]
pub struct KeyArgs {
    /// Table to inspect
    #[arg(short, long)]
    pub input: PathBuf,
    /// Field delimiter for CSV inputs
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Worksheet to read from a workbook (defaults to the first)
    #[arg(long)]
    pub sheet: Option<String>,
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" => Ok(b'\t'),
        "comma" => Ok(b','),
        "semicolon" => Ok(b';'),
        "pipe" => Ok(b'|'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(format!(
            "Delimiter must be a single ASCII character or one of tab/comma/semicolon/pipe, got '{other}'"
        )),
    }
}
