//! CLI entry point for the grade report tool.
//!
//! Reads the roster and per-student score sheets from an input directory,
//! computes weighted grades and writes the XLSX report.

use anyhow::Result;
use clap::Parser;
use grade_report::analyzers::analyzer::{GradingOptions, grade_course};
use grade_report::config::Overrides;
use grade_report::output::{print_json, print_pretty, write_summary_csv};
use grade_report::report::write_workbook;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "grade_report")]
#[command(about = "Compute weighted grades from CSV score sheets and write an Excel report", long_about = None)]
struct Cli {
    /// Directory holding the roster and the per-student grading files
    #[arg(short, long, value_name = "DIR")]
    input_dir: PathBuf,

    /// Path of the generated workbook
    #[arg(short, long, default_value = "grades_output.xlsx")]
    output: PathBuf,

    /// JSON file mapping usernames to explicit grading file names
    #[arg(long, value_name = "JSON")]
    overrides: Option<PathBuf>,

    /// Roster statuses to include
    #[arg(long, value_delimiter = ',', default_value = "autor,accepted")]
    allowed_status: Vec<String>,

    /// Optional: also write a flat CSV summary of every student's result
    #[arg(long, value_name = "PATH")]
    summary_csv: Option<PathBuf>,

    /// Also log every student's result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/grade_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("grade_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        error!(error = %format!("{err:#}"), "Grading failed; no report written");
        return Err(err);
    }

    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let overrides = match &cli.overrides {
        Some(path) => Overrides::load(path)?,
        None => Overrides::default(),
    };
    info!(count = overrides.len(), "File overrides loaded");

    let options = GradingOptions {
        allowed_statuses: cli.allowed_status.clone(),
        overrides,
    };

    let reports = grade_course(&cli.input_dir, &options)?;
    for report in &reports {
        print_pretty(report);
        if cli.json {
            print_json(report)?;
        }
    }

    write_workbook(&cli.output, &reports)?;
    info!(
        path = %cli.output.display(),
        students = reports.len(),
        "Successfully generated report"
    );

    if let Some(path) = &cli.summary_csv {
        write_summary_csv(path, &reports)?;
        info!(path = %path.display(), "Summary CSV written");
    }

    Ok(())
}
