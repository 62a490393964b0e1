//! Data types used by the grading pipeline.

use serde::{Deserialize, Serialize};

use crate::analyzers::rubric::{Dimension, DimensionKind};
use crate::resolver::GradingFiles;

/// A single row deserialized from the `;`-delimited roster.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Student {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "First name", default)]
    pub first_name: String,
    #[serde(rename = "Last name", default)]
    pub last_name: String,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

/// One rubric line of a `*-other.csv` file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Item", default)]
    pub item: String,
    #[serde(rename = "Score", default, deserialize_with = "csv::invalid_option")]
    pub score: Option<f64>,
    #[serde(rename = "Notes", default)]
    pub notes: String,
}

/// Raw correctness / convincingness / references cells of one dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DimensionScores {
    pub correctness: Option<f64>,
    pub convincingness: Option<f64>,
    pub references: Option<f64>,
}

impl DimensionScores {
    pub fn as_array(&self) -> [Option<f64>; 3] {
        [self.correctness, self.convincingness, self.references]
    }
}

/// One row of a `*-tasks.csv` file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskEntry {
    #[serde(rename = "Task", default)]
    pub task: String,
    #[serde(rename = "practicalTaskCorrect", default, deserialize_with = "csv::invalid_option")]
    pub correctness: Option<f64>,
    #[serde(rename = "practicalTaskDetails", default, deserialize_with = "csv::invalid_option")]
    pub detail: Option<f64>,

    #[serde(rename = "approachCorrect", default, deserialize_with = "csv::invalid_option")]
    pub approach_correct: Option<f64>,
    #[serde(rename = "approachConvincing", default, deserialize_with = "csv::invalid_option")]
    pub approach_convincing: Option<f64>,
    #[serde(rename = "approachReferences", default, deserialize_with = "csv::invalid_option")]
    pub approach_references: Option<f64>,

    #[serde(rename = "situationalityCorrect", default, deserialize_with = "csv::invalid_option")]
    pub situationality_correct: Option<f64>,
    #[serde(rename = "situationalityConvincing", default, deserialize_with = "csv::invalid_option")]
    pub situationality_convincing: Option<f64>,
    #[serde(rename = "situationalityReferences", default, deserialize_with = "csv::invalid_option")]
    pub situationality_references: Option<f64>,

    #[serde(rename = "implicationsCorrect", default, deserialize_with = "csv::invalid_option")]
    pub implications_correct: Option<f64>,
    #[serde(rename = "implicationsConvincing", default, deserialize_with = "csv::invalid_option")]
    pub implications_convincing: Option<f64>,
    #[serde(rename = "implicationsReferences", default, deserialize_with = "csv::invalid_option")]
    pub implications_references: Option<f64>,
}

impl TaskEntry {
    /// Column names this record understands.
    pub const COLUMNS: &'static [&'static str] = &[
        "Task",
        "practicalTaskCorrect",
        "practicalTaskDetails",
        "approachCorrect",
        "approachConvincing",
        "approachReferences",
        "situationalityCorrect",
        "situationalityConvincing",
        "situationalityReferences",
        "implicationsCorrect",
        "implicationsConvincing",
        "implicationsReferences",
    ];

    pub fn dimension(&self, kind: DimensionKind) -> DimensionScores {
        match kind {
            DimensionKind::Approach => DimensionScores {
                correctness: self.approach_correct,
                convincingness: self.approach_convincing,
                references: self.approach_references,
            },
            DimensionKind::Situationality => DimensionScores {
                correctness: self.situationality_correct,
                convincingness: self.situationality_convincing,
                references: self.situationality_references,
            },
            DimensionKind::Implications => DimensionScores {
                correctness: self.implications_correct,
                convincingness: self.implications_convincing,
                references: self.implications_references,
            },
        }
    }
}

/// A resolved, sanitized rubric line ready for scoring and display.
#[derive(Debug, Clone, PartialEq)]
pub struct RubricLine {
    pub label: &'static str,
    pub score: f64,
    pub max: f64,
    pub weight: f64,
    pub notes: String,
}

/// Rubric lines of one Solution Report dimension, taken from the "other" table.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionBreakdown {
    pub dimension: Dimension,
    pub lines: Vec<RubricLine>,
}

/// Sanitized dimension sub-scores of a single task row, in
/// [`crate::analyzers::rubric::DIMENSION_CRITERIA`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDimensionRow {
    pub task: String,
    pub scores: Vec<f64>,
}

/// A dimension whose percentage is averaged over the task rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedDimension {
    pub dimension: Dimension,
    pub rows: Vec<TaskDimensionRow>,
}

/// Where the Solution Report percentage comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SolutionReport {
    /// Rubric lines of the "other" table.
    Rubric(Vec<DimensionBreakdown>),
    /// No "other" table; dimension columns of the tasks table averaged per task.
    TaskAverage(Vec<AveragedDimension>),
    /// Neither table available.
    Missing,
}

/// Sanitized scores of one practical task, in
/// [`crate::analyzers::rubric::TASK_CRITERIA`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskLine {
    pub task: String,
    pub scores: Vec<f64>,
}

/// Everything the aggregate is computed from, after lookup and sanitation.
///
/// The workbook renders exactly these numbers, so both arithmetic paths
/// start from identical inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub formalities: Vec<RubricLine>,
    pub solution_report: SolutionReport,
    pub tasks: Vec<TaskLine>,
}

/// Category percentages, weighted total and grade of one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub formalities_pct: f64,
    pub practical_tasks_pct: f64,
    pub solution_report_pct: f64,
    pub total_pct: f64,
    pub letter_grade: String,
}

/// All per-student data produced by a run.
#[derive(Debug, Clone)]
pub struct StudentReport {
    pub student: Student,
    pub files: GradingFiles,
    pub breakdown: Breakdown,
    pub result: AggregateResult,
    pub free_text: Option<String>,
}

/// Flat CSV row of the optional summary file.
#[derive(Debug, Serialize)]
pub struct SummaryRow<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub formalities_pct: f64,
    pub practical_tasks_pct: f64,
    pub solution_report_pct: f64,
    pub total_pct: f64,
    pub letter_grade: &'a str,
}

impl<'a> From<&'a StudentReport> for SummaryRow<'a> {
    fn from(report: &'a StudentReport) -> Self {
        Self {
            username: &report.student.username,
            first_name: &report.student.first_name,
            last_name: &report.student.last_name,
            formalities_pct: report.result.formalities_pct,
            practical_tasks_pct: report.result.practical_tasks_pct,
            solution_report_pct: report.result.solution_report_pct,
            total_pct: report.result.total_pct,
            letter_grade: &report.result.letter_grade,
        }
    }
}
