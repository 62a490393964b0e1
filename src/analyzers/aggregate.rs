use crate::analyzers::grade::grade;
use crate::analyzers::rubric::{
    CATEGORY_WEIGHTS, Criterion, DIMENSION_CRITERIA, DIMENSIONS, FORMALITIES,
    FORMALITIES_CATEGORY, SOLUTION_REPORT_CATEGORY, TASK_CRITERIA,
};
use crate::analyzers::types::{
    AggregateResult, AveragedDimension, Breakdown, DimensionBreakdown, RubricLine, ScoreEntry,
    SolutionReport, TaskDimensionRow, TaskEntry, TaskLine,
};
use crate::analyzers::utility::{mean, sanitize, sum, weighted_pct};

/// Percentage of one Solution Report dimension.
pub fn dimension_pct(correctness: f64, convincingness: f64, references: f64) -> f64 {
    weighted_pct(&[correctness, convincingness, references], &DIMENSION_CRITERIA)
}

/// Percentage of one practical task.
pub fn task_pct(correctness: f64, detail: f64) -> f64 {
    weighted_pct(&[correctness, detail], &TASK_CRITERIA)
}

/// Weighted total of the three category percentages.
pub fn total_pct(formalities: f64, practical_tasks: f64, solution_report: f64) -> f64 {
    let w = CATEGORY_WEIGHTS;
    sum([
        formalities * w.formalities,
        practical_tasks * w.practical_tasks,
        solution_report * w.solution_report,
    ])
}

/// First row with exactly `category` whose item contains `item`, ignoring case.
pub fn find_entry<'a>(entries: &'a [ScoreEntry], category: &str, item: &str) -> Option<&'a ScoreEntry> {
    let needle = item.to_lowercase();
    entries
        .iter()
        .find(|e| e.category == category && e.item.to_lowercase().contains(&needle))
}

fn rubric_line(entries: &[ScoreEntry], category: &str, item: &str, criterion: &Criterion) -> RubricLine {
    let entry = find_entry(entries, category, item);
    RubricLine {
        label: criterion.label,
        score: sanitize(entry.and_then(|e| e.score), criterion.max),
        max: criterion.max,
        weight: criterion.weight,
        notes: entry.map(|e| e.notes.clone()).unwrap_or_default(),
    }
}

fn lines_pct(lines: &[RubricLine]) -> f64 {
    sum(lines.iter().map(|l| (l.score / l.max) * l.weight))
}

fn task_name(entry: &TaskEntry, index: usize) -> String {
    if entry.task.trim().is_empty() {
        format!("Task {}", index + 1)
    } else {
        entry.task.clone()
    }
}

impl Breakdown {
    /// Looks up and sanitizes every sub-score of one student.
    ///
    /// An `other` table that is absent or has no rows switches the Solution
    /// Report to the per-task average; no tasks either leaves it missing.
    pub fn from_tables(other: Option<&[ScoreEntry]>, tasks: &[TaskEntry]) -> Self {
        let other = other.filter(|rows| !rows.is_empty());

        let formalities = FORMALITIES
            .iter()
            .map(|f| rubric_line(other.unwrap_or(&[]), FORMALITIES_CATEGORY, f.item, &f.criterion))
            .collect();

        let solution_report = match other {
            Some(entries) => SolutionReport::Rubric(
                DIMENSIONS
                    .iter()
                    .map(|dim| DimensionBreakdown {
                        dimension: *dim,
                        lines: DIMENSION_CRITERIA
                            .iter()
                            .map(|c| rubric_line(entries, SOLUTION_REPORT_CATEGORY, &dim.item(c), c))
                            .collect(),
                    })
                    .collect(),
            ),
            None if !tasks.is_empty() => SolutionReport::TaskAverage(
                DIMENSIONS
                    .iter()
                    .map(|dim| AveragedDimension {
                        dimension: *dim,
                        rows: tasks
                            .iter()
                            .enumerate()
                            .map(|(i, t)| TaskDimensionRow {
                                task: task_name(t, i),
                                scores: t
                                    .dimension(dim.kind)
                                    .as_array()
                                    .iter()
                                    .zip(&DIMENSION_CRITERIA)
                                    .map(|(score, c)| sanitize(*score, c.max))
                                    .collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            ),
            None => SolutionReport::Missing,
        };

        let tasks = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| TaskLine {
                task: task_name(t, i),
                scores: [t.correctness, t.detail]
                    .iter()
                    .zip(&TASK_CRITERIA)
                    .map(|(score, c)| sanitize(*score, c.max))
                    .collect(),
            })
            .collect();

        Self {
            formalities,
            solution_report,
            tasks,
        }
    }

    pub fn formalities_pct(&self) -> f64 {
        lines_pct(&self.formalities)
    }

    pub fn practical_tasks_pct(&self) -> f64 {
        let per_task: Vec<f64> = self
            .tasks
            .iter()
            .map(|t| weighted_pct(&t.scores, &TASK_CRITERIA))
            .collect();
        mean(&per_task)
    }

    pub fn solution_report_pct(&self) -> f64 {
        match &self.solution_report {
            SolutionReport::Rubric(dims) => {
                sum(dims.iter().map(|d| lines_pct(&d.lines) * d.dimension.weight))
            }
            SolutionReport::TaskAverage(dims) => sum(dims.iter().map(|d| {
                let per_task: Vec<f64> = d
                    .rows
                    .iter()
                    .map(|r| weighted_pct(&r.scores, &DIMENSION_CRITERIA))
                    .collect();
                mean(&per_task) * d.dimension.weight
            })),
            SolutionReport::Missing => 0.0,
        }
    }

    /// Rolls the breakdown up into category percentages, total and grade.
    pub fn aggregate(&self) -> AggregateResult {
        let formalities_pct = self.formalities_pct();
        let practical_tasks_pct = self.practical_tasks_pct();
        let solution_report_pct = self.solution_report_pct();
        let total = total_pct(formalities_pct, practical_tasks_pct, solution_report_pct);

        AggregateResult {
            formalities_pct,
            practical_tasks_pct,
            solution_report_pct,
            total_pct: total,
            letter_grade: grade(total),
        }
    }
}

/// Aggregates one student's score tables into an [`AggregateResult`].
pub fn aggregate(other: Option<&[ScoreEntry]>, tasks: &[TaskEntry]) -> AggregateResult {
    Breakdown::from_tables(other, tasks).aggregate()
}
