//! XLSX report: layout, formula evaluation and writing.

pub mod formula;
pub mod layout;
pub mod xlsx;

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::{error, info};

use crate::analyzers::types::StudentReport;
use crate::report::formula::{Evaluator, Value};
use crate::report::layout::{
    MASTER_FORMALITIES_COL, MASTER_GRADE_COL, MASTER_PRACTICAL_COL, MASTER_SHEET,
    MASTER_SOLUTION_COL, MASTER_TOTAL_COL, WorkbookModel,
};

pub use crate::report::layout::build_workbook;

/// A master sheet cell whose evaluated value disagrees with the native result.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub username: String,
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

/// Evaluates the master sheet's category, total and grade cells and compares
/// them with each student's [`crate::analyzers::types::AggregateResult`].
pub fn audit(model: &WorkbookModel, reports: &[StudentReport]) -> Vec<Mismatch> {
    let evaluator = Evaluator::new(model);
    let mut mismatches = Vec::new();

    for (i, report) in reports.iter().enumerate() {
        let row = i as u32 + 1;
        let username = &report.student.username;

        let result = &report.result;
        for (field, col, expected) in [
            ("formalities_pct", MASTER_FORMALITIES_COL, result.formalities_pct),
            ("practical_tasks_pct", MASTER_PRACTICAL_COL, result.practical_tasks_pct),
            ("solution_report_pct", MASTER_SOLUTION_COL, result.solution_report_pct),
            ("total_pct", MASTER_TOTAL_COL, result.total_pct),
        ] {
            match &evaluator.cell_value(MASTER_SHEET, row, col) {
                Ok(Value::Number(n)) if *n == expected => {}
                other => mismatches.push(Mismatch {
                    username: username.clone(),
                    field,
                    expected: expected.to_string(),
                    actual: describe(other),
                }),
            }
        }

        let grade = evaluator.cell_value(MASTER_SHEET, row, MASTER_GRADE_COL);
        match &grade {
            Ok(Value::Text(g)) if *g == report.result.letter_grade => {}
            other => mismatches.push(Mismatch {
                username: username.clone(),
                field: "letter_grade",
                expected: report.result.letter_grade.clone(),
                actual: describe(other),
            }),
        }
    }

    mismatches
}

fn describe(value: &Result<Value>) -> String {
    match value {
        Ok(v) => v.to_cached(),
        Err(err) => format!("error: {err}"),
    }
}

/// Builds, audits and writes the workbook for `reports` to `path`.
///
/// Nothing is written unless every formula audit passes and the workbook
/// serialized successfully.
#[tracing::instrument(skip(reports), fields(path = %path.display(), students = reports.len()))]
pub fn write_workbook(path: &Path, reports: &[StudentReport]) -> Result<()> {
    let model = build_workbook(reports);

    let mismatches = audit(&model, reports);
    if !mismatches.is_empty() {
        for m in &mismatches {
            error!(
                username = %m.username,
                field = m.field,
                expected = %m.expected,
                actual = %m.actual,
                "Spreadsheet formula disagrees with computed result"
            );
        }
        bail!("{} formula audit mismatch(es); workbook not written", mismatches.len());
    }

    let bytes = xlsx::render(&model)?;
    std::fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!(bytes = bytes.len(), sheets = model.sheets.len(), "Workbook written");
    Ok(())
}
