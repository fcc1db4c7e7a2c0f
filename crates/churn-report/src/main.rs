//! CLI entry point for the churn report.

use anyhow::{Context, Result, anyhow};
use churn_report::config::{DEFAULT_ID_COLUMN, DEFAULT_TABLE};
use churn_report::{
    ChurnReport, DatabaseSettings, NullInjection, OutputFormat, Pipeline, ReportConfig,
    ReportGenerator, RunSummary, source,
};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use polars::prelude::DataFrame;
use std::path::PathBuf;
use tracing::info;

/// CLI-compatible output format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    /// Comma-separated values
    Csv,
    /// Apache Parquet
    Parquet,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(cli: CliOutputFormat) -> Self {
        match cli {
            CliOutputFormat::Csv => OutputFormat::Csv,
            CliOutputFormat::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Churn summary tables from the churn_modelling table",
    long_about = "Builds a cleaned copy of the churn_modelling table and derives three summary tables.\n\n\
                  ENVIRONMENT VARIABLES (when reading from Postgres):\n  \
                  postgres_host, postgres_database, postgres_user,\n  \
                  postgres_password, postgres_port\n  \
                  (upper-case names are accepted too; a .env file is loaded if present)\n\n\
                  EXAMPLES:\n  \
                  # Read from Postgres, write CSV tables to ./output\n  \
                  churn-report\n\n  \
                  # Offline run on an exported CSV with a fixed seed\n  \
                  churn-report --input-csv churn.csv --seed 42\n\n  \
                  # Summary as JSON only\n  \
                  churn-report --input-csv churn.csv --no-save --json"
)]
struct Args {
    /// Read the table from a CSV export instead of Postgres
    #[arg(short, long)]
    input_csv: Option<PathBuf>,

    /// Output directory for the summary tables
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// File format of the summary tables
    #[arg(short, long, value_enum, default_value = "csv")]
    format: CliOutputFormat,

    /// Seed for the missing-value injection
    ///
    /// Runs with the same seed and input produce identical tables
    #[arg(short, long)]
    seed: Option<u64>,

    /// Skip the missing-value injection
    #[arg(long)]
    no_injection: bool,

    /// Number of rows to blank before imputation
    #[arg(long, default_value = "30")]
    injection_rows: usize,

    /// Blanked rows are drawn from the first N rows
    #[arg(long, default_value = "10000")]
    injection_window: usize,

    /// Source table name
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    /// Identifier column dropped from the base table
    #[arg(long, default_value = DEFAULT_ID_COLUMN)]
    id_column: String,

    /// Do not write the summary tables to disk
    #[arg(long)]
    no_save: bool,

    /// Output JSON to stdout instead of the tables
    ///
    /// Disables all progress logs; only outputs the run summary.
    #[arg(long)]
    json: bool,

    /// Write the run summary to <output>/churn_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    let config = build_config(&args)?;

    let (raw, source_label) = load_table(&args, &config).await?;
    let rows_loaded = raw.height();

    let mut builder = Pipeline::builder().config(config.clone());
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    let report = pipeline
        .process(raw)
        .map_err(|e| anyhow!("Report failed [{}]: {}", e.error_code(), e))?;

    handle_output(&args, &config, &source_label, rows_loaded, &report)
}

fn build_config(args: &Args) -> Result<ReportConfig> {
    let injection = if args.no_injection {
        NullInjection::disabled()
    } else {
        NullInjection {
            enabled: true,
            rows: args.injection_rows,
            window: args.injection_window,
        }
    };

    let mut builder = ReportConfig::builder()
        .table(&args.table)
        .id_column(&args.id_column)
        .null_injection(injection)
        .output_dir(&args.output)
        .output_format(args.format.into())
        .save_to_disk(!args.no_save);

    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }

    Ok(builder.build()?)
}

/// Load the raw table from the CSV export or from Postgres.
async fn load_table(args: &Args, config: &ReportConfig) -> Result<(DataFrame, String)> {
    if let Some(ref path) = args.input_csv {
        let df = source::load_csv(path)
            .with_context(|| format!("Loading {}", path.display()))?;
        return Ok((df, path.display().to_string()));
    }

    let settings = DatabaseSettings::from_env().context("Reading database settings")?;
    let df = source::fetch_table(&settings, &config.table)
        .await
        .with_context(|| format!("Fetching table '{}'", config.table))?;
    Ok((df, format!("postgres:{}", config.table)))
}

/// Write files and print results based on CLI flags.
///
/// - Default: print the three tables to stdout
/// - `--json`: print the run summary as JSON to stdout only
/// - `--emit-report`: also write the run summary to a file
fn handle_output(
    args: &Args,
    config: &ReportConfig,
    source_label: &str,
    rows_loaded: usize,
    report: &ChurnReport,
) -> Result<()> {
    let generator = ReportGenerator::from_config(config);

    let mut written = if config.save_to_disk {
        generator.write_tables(report)?
    } else {
        Vec::new()
    };

    let mut summary =
        ReportGenerator::build_summary(source_label, rows_loaded, config.seed, report, &written)?;

    if args.emit_report {
        let path = generator.write_summary(&summary)?;
        written.push(path);
        summary.written_files = written.iter().map(|p| p.display().to_string()).collect();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_tables(report, &summary);
    Ok(())
}

/// Print the three tables and a short summary.
fn print_tables(report: &ChurnReport, summary: &RunSummary) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CHURN REPORT");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Source: {} ({} rows loaded, {} rows cleaned, {} rows blanked)",
        summary.source, summary.rows_loaded, summary.rows_cleaned, summary.injected_rows
    );
    for imputation in &summary.imputations {
        println!(
            "  {} imputed with {} ({} values)",
            imputation.column,
            imputation.method.as_str(),
            imputation.filled_count
        );
    }
    println!();

    println!("Average credit score by geography and gender:");
    println!("{}", report.credit_score);
    println!();

    println!("Age and salary by geography, gender and exit flag:");
    println!("{}", report.exited_age);
    println!();

    println!(
        "Exit flag against salary above {} ({:.1}% agreement):",
        summary.salary_threshold,
        summary.salary_agreement_rate * 100.0
    );
    println!("{}", report.salary.table);

    if !summary.written_files.is_empty() {
        println!();
        println!("Written:");
        for file in &summary.written_files {
            println!("  - {}", file);
        }
    }
    println!("{}", "=".repeat(80));
}
