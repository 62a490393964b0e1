use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};

use crate::analyzers::types::{Breakdown, StudentReport};
use crate::config::Overrides;
use crate::parser::{parse_free_text, parse_grading_other, parse_grading_tasks, parse_students};
use crate::resolver::Resolver;

/// Roster file names, tried in order.
pub const ROSTER_FILES: &[&str] = &["students.csv", "example-students.csv"];

/// Options of one grading run.
#[derive(Debug, Clone)]
pub struct GradingOptions {
    pub allowed_statuses: Vec<String>,
    pub overrides: Overrides,
}

impl Default for GradingOptions {
    fn default() -> Self {
        Self {
            allowed_statuses: crate::config::DEFAULT_ALLOWED_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            overrides: Overrides::default(),
        }
    }
}

/// Finds the roster inside `input_dir`.
///
/// # Errors
///
/// Fails when the directory or every roster candidate is missing.
pub fn locate_roster(input_dir: &Path) -> Result<PathBuf> {
    if !input_dir.is_dir() {
        bail!("input directory '{}' does not exist", input_dir.display());
    }
    match ROSTER_FILES
        .iter()
        .map(|name| input_dir.join(name))
        .find(|path| path.is_file())
    {
        Some(path) => Ok(path),
        None => bail!(
            "could not find {} in {}",
            ROSTER_FILES.join(" or "),
            input_dir.display()
        ),
    }
}

/// Loads the roster and grades every student in roster order.
///
/// Missing per-student files are not errors; a student without any file
/// still gets a (zero) result.
pub fn grade_course(input_dir: &Path, options: &GradingOptions) -> Result<Vec<StudentReport>> {
    let roster = locate_roster(input_dir)?;
    info!(path = %roster.display(), "Loading students");
    let students = parse_students(&roster, &options.allowed_statuses)?;
    info!(count = students.len(), "Identified students");

    let resolver = Resolver::new(input_dir, &options.overrides);
    let mut reports = Vec::with_capacity(students.len());

    for student in students {
        let span = info_span!("student", username = %student.username);
        let _enter = span.enter();

        let files = resolver.resolve(&student.username, &student.first_name, &student.last_name);
        if files.is_empty() {
            debug!("No grading files found");
        } else {
            info!(
                other = files.other.is_some(),
                tasks = files.tasks.is_some(),
                text = files.text.is_some(),
                "Found grading files"
            );
        }

        let other = files.other.as_deref().map(parse_grading_other).transpose()?;
        let tasks = match files.tasks.as_deref() {
            Some(path) => parse_grading_tasks(path)?,
            None => Vec::new(),
        };
        let free_text = files.text.as_deref().map(parse_free_text).transpose()?;

        let breakdown = Breakdown::from_tables(other.as_deref(), &tasks);
        let result = breakdown.aggregate();
        debug!(
            total_pct = result.total_pct,
            grade = %result.letter_grade,
            "Student graded"
        );

        reports.push(StudentReport {
            student,
            files,
            breakdown,
            result,
            free_text,
        });
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_locate_roster_prefers_students_csv() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("students.csv"), "Username\n").unwrap();
        fs::write(dir.path().join("example-students.csv"), "Username\n").unwrap();
        assert_eq!(locate_roster(dir.path()).unwrap(), dir.path().join("students.csv"));
    }

    #[test]
    fn test_locate_roster_falls_back_to_example() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("example-students.csv"), "Username\n").unwrap();
        assert_eq!(
            locate_roster(dir.path()).unwrap(),
            dir.path().join("example-students.csv")
        );
    }

    #[test]
    fn test_locate_roster_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_roster(dir.path()).unwrap_err();
        assert!(err.to_string().contains("students.csv"));

        let err = locate_roster(&dir.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_grade_course_student_without_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("students.csv"),
            "Username;First name;Last name;Status\nalice;Alice;Smith;autor\n",
        )
        .unwrap();

        let reports = grade_course(dir.path(), &GradingOptions::default()).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].files.is_empty());
        assert_eq!(reports[0].result.total_pct, 0.0);
        assert_eq!(reports[0].result.letter_grade, "5.0");
        assert!(reports[0].free_text.is_none());
    }
}
