//! CSV and text readers for the roster and the per-student grading files.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::analyzers::types::{ScoreEntry, Student, TaskEntry};

const ROSTER_COLUMNS: &[&str] = &["Username", "First name", "Last name", "Status"];
const OTHER_COLUMNS: &[&str] = &["Category", "Item", "Score", "Notes"];

fn reader(path: &Path, delimiter: u8) -> Result<csv::Reader<File>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file))
}

/// Reports header columns the record type has no field for.
fn log_ignored_columns(path: &Path, headers: &StringRecord, known: &[&str]) {
    let ignored: Vec<&str> = headers.iter().filter(|h| !known.contains(h)).collect();
    if !ignored.is_empty() {
        debug!(path = %path.display(), ?ignored, "Ignoring unrecognized columns");
    }
}

fn read_records<T: DeserializeOwned>(path: &Path, delimiter: u8, known: &[&str]) -> Result<Vec<T>> {
    let mut rdr = reader(path, delimiter)?;
    let headers = rdr
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();
    log_ignored_columns(path, &headers, known);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("malformed row in {}", path.display()))?;
        rows.push(record);
    }
    Ok(rows)
}

/// Parses the `;`-delimited roster.
///
/// When the file has a `Status` column only rows whose status is in
/// `allowed_statuses` are kept. Rows without a username are dropped.
pub fn parse_students(path: &Path, allowed_statuses: &[String]) -> Result<Vec<Student>> {
    let has_status = reader(path, b';')?
        .headers()
        .map(|h| h.iter().any(|c| c == "Status"))
        .unwrap_or(false);

    let students: Vec<Student> = read_records(path, b';', ROSTER_COLUMNS)?;
    let total = students.len();

    let kept: Vec<Student> = students
        .into_iter()
        .filter(|s| !s.username.is_empty())
        .filter(|s| {
            !has_status
                || s
                    .status
                    .as_deref()
                    .is_some_and(|status| allowed_statuses.iter().any(|a| a == status))
        })
        .collect();

    debug!(path = %path.display(), total, kept = kept.len(), "Roster parsed");
    Ok(kept)
}

/// Parses a `*-other.csv` rubric file.
pub fn parse_grading_other(path: &Path) -> Result<Vec<ScoreEntry>> {
    read_records(path, b',', OTHER_COLUMNS)
}

/// Parses a `*-tasks.csv` file.
pub fn parse_grading_tasks(path: &Path) -> Result<Vec<TaskEntry>> {
    read_records(path, b',', TaskEntry::COLUMNS)
}

/// Reads a free-text feedback file verbatim; invalid UTF-8 is replaced.
pub fn parse_free_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
