pub mod cli;
pub mod data;
pub mod error;
pub mod fingerprint;
pub mod io_utils;
pub mod key;
pub mod loader;
pub mod pipeline;
pub mod reconcile;
pub mod render;
pub mod report;
pub mod schema;
pub mod summary;
pub mod table;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, InputOptions},
    loader::LoadOptions,
    report::ReportFormat,
    table::Table,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("data_recon", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => handle_validate(&args),
        Commands::Schema(args) => handle_schema(&args),
        Commands::Key(args) => handle_key(&args),
    }
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let (source, target) = load_pair(&args.source, &args.target, &args.inputs)?;
    let reconciliation = staged(
        pipeline::reconcile(&source, &target),
        format!("Reconciling {:?} against {:?}", args.target, args.source),
    )?;
    let format = args
        .format
        .unwrap_or_else(|| ReportFormat::from_path(&args.output));
    debug!("Writing report as {format:?}");
    staged(
        report::write_report(&reconciliation.result_tables(), &args.output, format),
        format!("Writing report to {:?}", args.output),
    )?;

    if args.json {
        let json = serde_json::to_string_pretty(&reconciliation.summary)
            .context("Serializing summary")?;
        println!("{json}");
    } else {
        render::print_result(&reconciliation.summary.to_table());
    }
    info!("Validation report generated at {:?}", args.output);
    Ok(())
}

fn handle_schema(args: &cli::SchemaArgs) -> Result<()> {
    let (source, target) = load_pair(&args.source, &args.target, &args.inputs)?;
    let checks = schema::compare_schemas(&source, &target);
    render::print_result(&schema::schema_table(&checks));
    let mismatched = checks.iter().filter(|check| !check.matches).count();
    info!(
        "{} of {} column(s) agree",
        checks.len() - mismatched,
        checks.len()
    );
    Ok(())
}

fn handle_key(args: &cli::KeyArgs) -> Result<()> {
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        sheet: args.sheet.clone(),
    };
    let table = load(&args.input, &options)?;
    let key = staged(
        key::select_primary_key(&table),
        format!("Detecting primary key of {:?}", args.input),
    )?;
    println!("{key}");
    Ok(())
}

fn load_pair(source: &Path, target: &Path, inputs: &InputOptions) -> Result<(Table, Table)> {
    let source_options = LoadOptions {
        delimiter: inputs.delimiter,
        encoding: io_utils::resolve_encoding(inputs.source_encoding.as_deref())?,
        sheet: inputs.source_sheet.clone(),
    };
    let target_options = LoadOptions {
        delimiter: inputs.delimiter,
        encoding: io_utils::resolve_encoding(inputs.target_encoding.as_deref())?,
        sheet: inputs.target_sheet.clone(),
    };
    Ok((load(source, &source_options)?, load(target, &target_options)?))
}

fn load(path: &Path, options: &LoadOptions) -> Result<Table> {
    staged(
        loader::load_table(path, options),
        format!("Loading table {path:?}"),
    )
}

/// Attach the failing pipeline stage to a core error.
fn staged<T>(result: error::Result<T>, action: String) -> Result<T> {
    result.map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("{action} ({stage} stage failed)"))
    })
}
