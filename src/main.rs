//! CLI entry point for the churn data explorer.

use anyhow::{Result, anyhow};
use churn_navigator::{
    CleanedTable, Cleaner, FilterEngine, FilterPredicates, Summarizer, TableStore, export,
    template, upload,
};
use clap::{Parser, ValueEnum};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Export format selector.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// Excel workbook (.xlsx)
    Xlsx,
    /// Stata dataset, format 114 (.dta)
    Dta,
    /// HTML table markup (.html)
    Html,
    /// JSON array of row objects (.json)
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Dta => "dta",
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Telecom churn data explorer",
    long_about = "Validate, clean, filter and summarize churn datasets.\n\n\
                  EXAMPLES:\n  \
                  # Validate and summarize an upload\n  \
                  churn-navigator -i expresso.csv\n\n  \
                  # Save the upload under a user, then clean it\n  \
                  churn-navigator -i expresso.csv --username amy --store-dir ./store\n\n  \
                  # Filter a cleaned view and export it\n  \
                  churn-navigator -i expresso.csv --equals REGION=DAKAR \\\n      \
                  --range MONTANT:1000:5000 --export dta -o view.dta"
)]
struct Args {
    /// Path to the upload (.csv or .xlsx)
    #[arg(short, long)]
    input: String,

    /// Save the validated upload for this user before cleaning
    #[arg(long, requires = "store_dir")]
    username: Option<String>,

    /// Root directory of the table store
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Equality filter on a categorical column, as COLUMN=VALUE
    #[arg(long, value_name = "COLUMN=VALUE")]
    equals: Option<String>,

    /// Equality filter on the row key
    #[arg(long, value_name = "VALUE")]
    key: Option<String>,

    /// Inclusive range filter on a numeric column, as COLUMN:MIN:MAX (repeatable)
    #[arg(long, value_name = "COLUMN:MIN:MAX")]
    range: Vec<String>,

    /// Export the final view in this format
    #[arg(long, value_enum)]
    export: Option<ExportFormat>,

    /// Output path for the export
    ///
    /// Defaults to the input stem with the export format's extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and the final summary)
    #[arg(short, long)]
    quiet: bool,

    /// Output the summary as JSON to stdout instead of tables
    ///
    /// Disables all progress logs; only JSON is written to stdout.
    #[arg(long)]
    json: bool,
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

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let path = Path::new(&args.input);
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&args.input);

    info!("Loading upload from: {}", args.input);
    let bytes = std::fs::read(path)?;
    let raw = upload::read_upload(&bytes, filename)?;
    info!("Upload parsed: {:?}", raw.shape());

    let schema = template::reference_schema();
    churn_navigator::SchemaValidator::check(&raw, &schema)?;
    info!("Schema validated against the reference template");

    if let (Some(username), Some(store_dir)) = (&args.username, &args.store_dir) {
        let store = TableStore::new(store_dir.clone());
        let record = store.save(username, &raw)?;
        info!(
            "Saved as '{}' at {}",
            record.table_name,
            record.path.display()
        );
    }

    let (cleaned, report) = Cleaner::clean(&raw, template::TARGET_COLUMN)?;
    for warning in &report.warnings {
        warn!("{warning}");
    }

    let predicates = build_predicates(&args)?;
    let view_df = if predicates.is_empty() {
        cleaned.df.clone()
    } else {
        FilterEngine::apply(&cleaned, &predicates)?
    };
    info!(
        "View holds {} of {} rows",
        view_df.height(),
        cleaned.df.height()
    );

    // The view keeps the row key for exports, but summaries skip it.
    let view = CleanedTable {
        df: view_df,
        key_column: cleaned.key_column.clone(),
    };
    let summary = Summarizer::summarize_cleaned(&view)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&args, &view.df, &summary, &report);
    }

    if let Some(format) = args.export {
        let bytes = match format {
            ExportFormat::Xlsx => export::to_excel_bytes(&view.df)?,
            ExportFormat::Dta => export::to_stata_bytes(&view.df)?,
            ExportFormat::Html => export::to_html_bytes(&view.df)?,
            ExportFormat::Json => export::to_json_bytes(&view.df)?,
        };
        let out_path = args
            .output
            .clone()
            .unwrap_or_else(|| default_output(path, format));
        std::fs::write(&out_path, bytes)?;
        info!("Exported {:?} to {}", format, out_path.display());
    }

    Ok(())
}

fn build_predicates(args: &Args) -> Result<FilterPredicates> {
    let mut predicates = FilterPredicates::new();

    if let Some(clause) = &args.equals {
        let (column, value) = clause
            .split_once('=')
            .ok_or_else(|| anyhow!("--equals expects COLUMN=VALUE, got '{clause}'"))?;
        predicates = predicates.with_categorical(column, value);
    }

    if let Some(value) = &args.key {
        predicates = predicates.with_key(value.clone());
    }

    for clause in &args.range {
        let parts: Vec<&str> = clause.split(':').collect();
        let [column, min, max] = parts.as_slice() else {
            return Err(anyhow!("--range expects COLUMN:MIN:MAX, got '{clause}'"));
        };
        let min: f64 = min
            .parse()
            .map_err(|_| anyhow!("invalid range minimum '{min}' in '{clause}'"))?;
        let max: f64 = max
            .parse()
            .map_err(|_| anyhow!("invalid range maximum '{max}' in '{clause}'"))?;
        predicates = predicates.with_range(*column, min, max);
    }

    Ok(predicates)
}

fn default_output(input: &Path, format: ExportFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    PathBuf::from(format!("{stem}.{}", format.extension()))
}

/// Print a human-readable summary of the cleaned, filtered view.
///
/// Uses `println!` intentionally for user-facing output; unlike logging it
/// must stay visible regardless of log level.
fn print_summary(
    args: &Args,
    view: &DataFrame,
    summary: &churn_navigator::TableSummary,
    report: &churn_navigator::CleanReport,
) {
    println!();
    println!("{}", "=".repeat(80));
    println!("DATA SUMMARY");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input:  {} ({} rows x {} columns after filters)",
        args.input,
        view.height(),
        view.width()
    );
    println!();

    if !summary.numeric.is_empty() {
        println!("NUMERIC FEATURES");
        println!("{}", "-".repeat(40));
        println!(
            "{:<16} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "Feature", "Count", "Mean", "Std", "Min", "Median", "Max"
        );
        for col in &summary.numeric {
            println!(
                "{:<16} {:>8} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
                col.feature, col.count, col.mean, col.std, col.min, col.q50, col.max
            );
        }
        println!();
    }

    if !summary.categorical.is_empty() {
        println!("CATEGORICAL FEATURES");
        println!("{}", "-".repeat(40));
        println!(
            "{:<16} {:>8} {:>8} {:>16} {:>8}",
            "Feature", "Count", "Unique", "Top", "Freq"
        );
        for col in &summary.categorical {
            println!(
                "{:<16} {:>8} {:>8} {:>16} {:>8}",
                col.feature,
                col.count,
                col.unique,
                col.top.as_deref().unwrap_or("-"),
                col.freq.map_or("-".to_string(), |f| f.to_string())
            );
        }
        println!();
    }

    println!("CLEANING STEPS");
    println!("{}", "-".repeat(40));
    for step in &report.steps {
        println!("  - {step}");
    }
    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  ! {warning}");
        }
    }
    println!();
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
