use chrono::Local;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use movement_history_builder::{
    CsvRecordStore, IncomeStatement, MovementHistoryError, MovementPipeline, MovementRecord,
    PdfTextSource, PipelineConfig, PlainTextSource, RecordStore, Result, TextSource,
};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    /// Replace the stored table with this run's records
    Overwrite,
    /// Merge this run's records into the stored table
    Incremental,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Source {
    Pdf,
    Text,
}

#[derive(Parser, Debug)]
#[command(
    name = "movement-sync",
    version,
    about = "Builds the reconciled stock movement table from exported ERP reports"
)]
struct Cli {
    /// Pipeline configuration (JSON)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    #[arg(long = "mode", value_enum, default_value = "incremental")]
    mode: Mode,

    /// Kind of report files to read
    #[arg(long = "source", value_enum, default_value = "pdf")]
    source: Source,

    /// Print the configuration JSON schema and exit
    #[arg(long = "print-config-schema")]
    print_config_schema: bool,

    /// Print the JSON schema of a stored movement record and exit
    #[arg(long = "print-record-schema")]
    print_record_schema: bool,

    /// Print the income statement summary of this run
    #[arg(long = "statement")]
    statement: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.print_config_schema {
        println!("{}", PipelineConfig::schema_as_json()?);
        return Ok(());
    }
    if cli.print_record_schema {
        println!("{}", MovementRecord::schema_as_json()?);
        return Ok(());
    }

    let config_path = cli.config.clone().ok_or_else(|| {
        MovementHistoryError::ConfigError("--config is required".to_string())
    })?;
    let config = PipelineConfig::from_path(&config_path)?;

    match cli.source {
        Source::Pdf => execute(&cli, config, PdfTextSource),
        Source::Text => execute(&cli, config, PlainTextSource),
    }
}

fn execute<S: TextSource>(cli: &Cli, config: PipelineConfig, source: S) -> Result<()> {
    let store = CsvRecordStore::new(&config.store_path);
    let pipeline = MovementPipeline::new(config, source)?;

    if let Mode::Incremental = cli.mode {
        let today = Local::now().date_naive();
        let window = pipeline.extraction_window(&store, today)?;
        info!(
            "Reports should cover {} to {}",
            window.start.format("%d/%m/%Y"),
            window.end.format("%d/%m/%Y")
        );
    }

    let summary = match cli.mode {
        Mode::Overwrite => pipeline.overwrite(&store)?,
        Mode::Incremental => pipeline.sync(&store)?,
    };

    for path in &summary.skipped_files {
        warn!("Skipped report: {}", path.display());
    }
    for warning in &summary.warnings {
        warn!("{}", warning);
    }

    println!(
        "{} new lines, {} stored ({} before, {} duplicates removed, {} without inventory cost)",
        summary.new_records,
        summary.stored_after,
        summary.stored_before,
        summary.duplicates_removed,
        summary.unmatched
    );

    if cli.statement {
        let statement = IncomeStatement::from_records(&store.load()?);
        println!("\n{}", statement.to_markdown());
    }

    Ok(())
}
