//! Output formatting and persistence for grading results.
//!
//! Supports pretty-printing, JSON logging, and the flat CSV summary.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::{StudentReport, SummaryRow};

/// Logs a student's result using Rust's debug pretty-print format.
pub fn print_pretty(report: &StudentReport) {
    debug!(username = %report.student.username, "{:#?}", report.result);
}

/// Logs a student's result as pretty-printed JSON.
pub fn print_json(report: &StudentReport) -> Result<()> {
    info!(
        username = %report.student.username,
        "{}",
        serde_json::to_string_pretty(&report.result)?
    );
    Ok(())
}

/// Writes one [`SummaryRow`] per student, with a header, to a CSV file.
///
/// An existing file is replaced.
pub fn write_summary_csv(path: &Path, reports: &[StudentReport]) -> Result<()> {
    debug!(path = %path.display(), rows = reports.len(), "Writing CSV summary");

    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    for report in reports {
        writer.serialize(SummaryRow::from(report))?;
    }
    writer.flush()?;

    Ok(())
}
