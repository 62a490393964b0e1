//! In-memory workbook model and the grading report layout.
//!
//! The layout is built here as plain data (cells, merges, column settings) so
//! the same model can be evaluated by [`crate::report::formula`] and written by
//! [`crate::report::xlsx`]. Every formula is generated from the rubric table.

use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::analyzers::grade::lookup_table;
use crate::analyzers::rubric::{
    CATEGORY_WEIGHTS, Criterion, DIMENSION_CRITERIA, Dimension, TASK_CRITERIA, percent_label,
};
use crate::analyzers::types::{RubricLine, SolutionReport, StudentReport};

pub const MASTER_SHEET: &str = "Master Overview";
pub const MAPPING_SHEET: &str = "GradeMapping";

/// Master sheet columns holding the linked values.
pub const MASTER_FORMALITIES_COL: u16 = 3;
pub const MASTER_PRACTICAL_COL: u16 = 4;
pub const MASTER_SOLUTION_COL: u16 = 5;
pub const MASTER_TOTAL_COL: u16 = 6;
pub const MASTER_GRADE_COL: u16 = 7;

const MAX_SHEET_NAME: usize = 31;

/// Excel's per-cell character limit.
pub const MAX_CELL_CHARS: usize = 32_767;

// Student sheet columns.
const COL_LABEL: u16 = 0;
const COL_ITEM: u16 = 1;
const COL_SCORE: u16 = 2;
const COL_MAX: u16 = 3;
const COL_RESULT: u16 = 4;
const COL_NOTES: u16 = 7;
const COL_HIDDEN: u16 = 8;
const LAST_COL: u16 = COL_NOTES;

/// Visual style of a cell; mapped to a concrete format by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Plain,
    Header,
    Title,
    Section,
    ColumnHeader,
    ColumnHeaderCenter,
    Label,
    DimensionLabel,
    Score,
    Percent,
    Grade,
    Total,
    TotalPercent,
    FinalGrade,
    Wrapped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    /// Formula text without the leading `=`.
    Formula(String),
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
    pub text: String,
    pub style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub width: f64,
    pub hidden: bool,
}

/// One worksheet of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub hidden: bool,
    pub cells: BTreeMap<(u32, u16), Cell>,
    pub merges: Vec<Merge>,
    pub columns: BTreeMap<u16, Column>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            cells: BTreeMap::new(),
            merges: Vec::new(),
            columns: BTreeMap::new(),
        }
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn text(&mut self, row: u32, col: u16, text: impl Into<String>, style: Style) {
        self.set(row, col, CellValue::Text(text.into()), style);
    }

    pub fn number(&mut self, row: u32, col: u16, value: f64, style: Style) {
        self.set(row, col, CellValue::Number(value), style);
    }

    pub fn formula(&mut self, row: u32, col: u16, formula: impl Into<String>, style: Style) {
        self.set(row, col, CellValue::Formula(formula.into()), style);
    }

    pub fn blank(&mut self, row: u32, col: u16, style: Style) {
        self.set(row, col, CellValue::Blank, style);
    }

    pub fn merge(
        &mut self,
        first_row: u32,
        first_col: u16,
        last_row: u32,
        last_col: u16,
        text: impl Into<String>,
        style: Style,
    ) {
        self.merges.push(Merge {
            first_row,
            first_col,
            last_row,
            last_col,
            text: text.into(),
            style,
        });
    }

    pub fn column(&mut self, col: u16, width: f64) {
        self.columns.insert(col, Column { width, hidden: false });
    }

    pub fn hide_column(&mut self, col: u16) {
        self.columns
            .entry(col)
            .or_insert(Column {
                width: 8.43,
                hidden: false,
            })
            .hidden = true;
    }

    fn set(&mut self, row: u32, col: u16, value: CellValue, style: Style) {
        self.cells.insert((row, col), Cell { value, style });
    }
}

/// All sheets in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookModel {
    pub sheets: Vec<Sheet>,
}

impl WorkbookModel {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// Convert column number to Excel letter (0 -> A, 25 -> Z, 26 -> AA)
pub fn col_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as u32;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// `A1`-style reference of a zero-based cell.
pub fn cell_ref(row: u32, col: u16) -> String {
    format!("{}{}", col_letter(col), row + 1)
}

/// Quotes a sheet name for use in a formula.
pub fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Cross-sheet reference such as `'alice'!E7`.
pub fn sheet_ref(sheet: &str, row: u32, col: u16) -> String {
    format!("{}!{}", quote_sheet(sheet), cell_ref(row, col))
}

/// `SUM(t1,t2,...)`, the spreadsheet twin of [`crate::analyzers::utility::sum`].
fn sum_formula(terms: &[String]) -> String {
    format!("SUM({})", terms.join(","))
}

/// `(score/max)*weight`.
fn ratio_term(score: &str, max: &str, weight: f64) -> String {
    format!("({score}/{max})*{weight}")
}

/// `value*weight`.
fn weighted_term(value: &str, weight: f64) -> String {
    format!("{value}*{weight}")
}

/// Absolute range of the grade lookup table on the mapping sheet.
pub fn mapping_range() -> String {
    let last = lookup_table().len() as u32 - 1;
    format!(
        "{}!$A$1:$B${}",
        quote_sheet(MAPPING_SHEET),
        last + 1
    )
}

/// Makes `username` a valid, unique worksheet name.
///
/// Excel forbids `[]:*?/\`, leading or trailing apostrophes and names over
/// 31 characters, and compares names case-insensitively.
pub fn sheet_name(username: &str, used: &mut HashSet<String>) -> String {
    let mut base: String = username
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .collect();
    if base.starts_with('\'') {
        base.replace_range(..1, "_");
    }
    if base.ends_with('\'') {
        base.pop();
        base.push('_');
    }
    if base.trim().is_empty() {
        base = "Student".into();
    }

    let mut n = 1;
    loop {
        let suffix = if n == 1 { String::new() } else { format!("~{n}") };
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        let candidate: String = base.chars().take(keep).chain(suffix.chars()).collect();
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

/// Cells on a student sheet that the master sheet links to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudentCells {
    pub formalities: (u32, u16),
    pub solution_report: (u32, u16),
    pub practical_tasks: (u32, u16),
    pub total: (u32, u16),
    pub grade: (u32, u16),
}

struct StudentSheetWriter<'a> {
    sheet: Sheet,
    report: &'a StudentReport,
    row: u32,
}

impl<'a> StudentSheetWriter<'a> {
    fn new(name: String, report: &'a StudentReport) -> Self {
        let mut sheet = Sheet::new(name);
        sheet.column(0, 25.0);
        sheet.column(1, 30.0);
        for col in 2..=5 {
            sheet.column(col, 12.0);
        }
        sheet.column(6, 2.0);
        sheet.column(COL_NOTES, 50.0);
        sheet.hide_column(COL_HIDDEN);

        Self {
            sheet,
            report,
            row: 0,
        }
    }

    fn section(&mut self, title: &str) {
        self.sheet.merge(self.row, 0, self.row, LAST_COL, title, Style::Section);
        self.row += 1;
    }

    fn full_width(&mut self, text: &str, style: Style) {
        self.sheet.merge(self.row, 0, self.row, LAST_COL, text, style);
        self.row += 1;
    }

    /// Writes `label` over A:D and `formula` into E, returning E's position.
    fn total_row(&mut self, label: &str, formula: String) -> (u32, u16) {
        let row = self.row;
        self.sheet.merge(row, 0, row, 3, label, Style::Total);
        self.sheet.formula(row, COL_RESULT, formula, Style::TotalPercent);
        for col in 5..=LAST_COL {
            self.sheet.blank(row, col, Style::Total);
        }
        self.row += 1;
        (row, COL_RESULT)
    }

    fn column_headers(&mut self, first: &str, headers: &[(u16, &str)]) {
        let row = self.row;
        self.sheet.merge(row, 0, row, 1, first, Style::ColumnHeader);
        for col in 2..=LAST_COL {
            self.sheet.blank(row, col, Style::ColumnHeader);
        }
        for (col, text) in headers {
            let style = if *col == COL_NOTES {
                Style::ColumnHeader
            } else {
                Style::ColumnHeaderCenter
            };
            self.sheet.text(row, *col, *text, style);
        }
        self.row += 1;
    }

    /// Score in C, max in D, notes in H; returns the weighted term.
    fn rubric_row(&mut self, line: &RubricLine) -> String {
        let row = self.row;
        self.sheet.number(row, COL_SCORE, line.score, Style::Score);
        self.sheet.number(row, COL_MAX, line.max, Style::Score);
        if !line.notes.is_empty() {
            let notes = clip_cell_text(&line.notes, &self.report.student.username, "notes");
            self.sheet.text(row, COL_NOTES, notes, Style::Wrapped);
        }
        self.row += 1;
        ratio_term(&cell_ref(row, COL_SCORE), &cell_ref(row, COL_MAX), line.weight)
    }

    fn title(&mut self) {
        let report = self.report;
        let s = &report.student;
        self.full_width(
            &format!("Grading Report: {} {} ({})", s.first_name, s.last_name, s.username),
            Style::Title,
        );
        for ambiguity in &report.files.ambiguities {
            let names: Vec<String> = ambiguity
                .candidates
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            self.full_width(
                &format!("Several files matched, used the first: {}", names.join(", ")),
                Style::Plain,
            );
        }
        self.row += 1;
    }

    fn formalities(&mut self) -> (u32, u16) {
        self.section(&format!(
            "1. Overall Formalities ({})",
            percent_label(CATEGORY_WEIGHTS.formalities)
        ));
        self.column_headers(
            "Category",
            &[(COL_SCORE, "Score"), (COL_MAX, "Max"), (COL_NOTES, "Notes")],
        );

        let report = self.report;
        let mut terms = Vec::new();
        for line in &report.breakdown.formalities {
            self.sheet.merge(
                self.row,
                COL_LABEL,
                self.row,
                COL_ITEM,
                format!("{} (w: {})", line.label, percent_label(line.weight)),
                Style::Label,
            );
            terms.push(self.rubric_row(line));
        }

        let cell = self.total_row("Formalities Sub-Total %", sum_formula(&terms));
        self.row += 1;
        cell
    }

    fn solution_report(&mut self) -> (u32, u16) {
        self.section(&format!(
            "2. Solution Report ({})",
            percent_label(CATEGORY_WEIGHTS.solution_report)
        ));

        let report = self.report;
        let breakdown = &report.breakdown;
        let dimension_terms: Vec<String> = match &breakdown.solution_report {
            SolutionReport::Rubric(dims) => {
                self.sheet.text(self.row, COL_LABEL, "Dimension", Style::ColumnHeader);
                self.sheet.text(self.row, COL_ITEM, "Item", Style::ColumnHeader);
                self.sheet.text(self.row, COL_SCORE, "Score", Style::ColumnHeaderCenter);
                self.sheet.text(self.row, COL_MAX, "Max", Style::ColumnHeaderCenter);
                for col in 4..COL_NOTES {
                    self.sheet.blank(self.row, col, Style::ColumnHeader);
                }
                self.sheet.text(self.row, COL_NOTES, "Notes", Style::ColumnHeader);
                self.row += 1;

                let mut subtotals = Vec::new();
                for dim in dims {
                    let start = self.row;
                    let mut terms = Vec::new();
                    for line in &dim.lines {
                        self.sheet.text(
                            self.row,
                            COL_ITEM,
                            format!("{} (w: {})", line.label, percent_label(line.weight)),
                            Style::Label,
                        );
                        terms.push(self.rubric_row(line));
                    }
                    self.sheet.merge(
                        start,
                        COL_LABEL,
                        self.row - 1,
                        COL_LABEL,
                        dimension_label(&dim.dimension),
                        Style::DimensionLabel,
                    );
                    let (row, col) = self.total_row(
                        &format!("{} Sub-Total", dim.dimension.name),
                        sum_formula(&terms),
                    );
                    subtotals.push(weighted_term(&cell_ref(row, col), dim.dimension.weight));
                }
                subtotals
            }
            SolutionReport::TaskAverage(dims) => {
                self.full_width(
                    "No rubric file found; dimension scores are averaged over the practical tasks.",
                    Style::Plain,
                );
                let mut subtotals = Vec::new();
                for dim in dims {
                    let headers: Vec<(u16, &str)> = DIMENSION_CRITERIA
                        .iter()
                        .enumerate()
                        .map(|(i, c)| (COL_SCORE + i as u16, c.label))
                        .collect();
                    self.column_headers(&dimension_label(&dim.dimension).replace('\n', " "), &headers);

                    let first = self.row;
                    for task in &dim.rows {
                        let row = self.row;
                        self.sheet.merge(row, COL_LABEL, row, COL_ITEM, task.task.clone(), Style::Label);
                        let terms: Vec<String> = task
                            .scores
                            .iter()
                            .zip(&DIMENSION_CRITERIA)
                            .enumerate()
                            .map(|(i, (score, c))| {
                                let col = COL_SCORE + i as u16;
                                self.sheet.number(row, col, *score, Style::Score);
                                ratio_term(&cell_ref(row, col), &c.max.to_string(), c.weight)
                            })
                            .collect();
                        self.sheet.formula(row, COL_HIDDEN, sum_formula(&terms), Style::Percent);
                        self.row += 1;
                    }
                    let (row, col) = self.total_row(
                        &format!("{} Average", dim.dimension.name),
                        average_formula(first, self.row - 1),
                    );
                    subtotals.push(weighted_term(&cell_ref(row, col), dim.dimension.weight));
                }
                subtotals
            }
            SolutionReport::Missing => {
                self.full_width("No solution report data.", Style::Label);
                Vec::new()
            }
        };

        let formula = if dimension_terms.is_empty() {
            "0".to_string()
        } else {
            sum_formula(&dimension_terms)
        };
        let cell = self.total_row("Solution Report Final Sub-Total %", formula);
        self.row += 1;
        cell
    }

    fn practical_tasks(&mut self) -> (u32, u16) {
        self.section(&format!(
            "3. Practical Tasks ({})",
            percent_label(CATEGORY_WEIGHTS.practical_tasks)
        ));
        self.column_headers(
            "Task",
            &[
                (2, "Corr. Score"),
                (3, "Corr. Max"),
                (4, "Det. Score"),
                (5, "Det. Max"),
                (COL_NOTES, "Notes"),
            ],
        );

        let report = self.report;
        let tasks = &report.breakdown.tasks;
        let formula = if tasks.is_empty() {
            self.full_width("No tasks data.", Style::Label);
            "0".to_string()
        } else {
            let first = self.row;
            for task in tasks {
                let row = self.row;
                self.sheet.merge(row, COL_LABEL, row, COL_ITEM, task.task.clone(), Style::Label);
                let terms: Vec<String> = task
                    .scores
                    .iter()
                    .zip(&TASK_CRITERIA)
                    .enumerate()
                    .map(|(i, (score, c))| task_cell(&mut self.sheet, row, i, *score, c))
                    .collect();
                self.sheet.formula(row, COL_HIDDEN, sum_formula(&terms), Style::Percent);
                self.row += 1;
            }
            average_formula(first, self.row - 1)
        };

        let cell = self.total_row("Practical Tasks Average %", formula);
        self.row += 2;
        cell
    }

    fn final_aggregation(
        &mut self,
        formalities: (u32, u16),
        solution: (u32, u16),
        practical: (u32, u16),
    ) -> ((u32, u16), (u32, u16)) {
        self.section("--- FINAL AGGREGATION ---");

        let w = CATEGORY_WEIGHTS;
        for (label, weight, (row, col)) in [
            ("Overall Formalities", w.formalities, formalities),
            ("Solution Report", w.solution_report, solution),
            ("Practical Tasks", w.practical_tasks, practical),
        ] {
            self.sheet.merge(
                self.row,
                0,
                self.row,
                3,
                format!("{label} ({})", percent_label(weight)),
                Style::Label,
            );
            self.sheet.formula(self.row, COL_RESULT, cell_ref(row, col), Style::Percent);
            self.row += 1;
        }

        let total = self.total_row(
            "Total Final Percentage",
            sum_formula(&[
                weighted_term(&cell_ref(formalities.0, formalities.1), w.formalities),
                weighted_term(&cell_ref(practical.0, practical.1), w.practical_tasks),
                weighted_term(&cell_ref(solution.0, solution.1), w.solution_report),
            ]),
        );

        let grade = self.total_row(
            "Total Final Grade",
            format!(
                "VLOOKUP({},{},2,TRUE)",
                cell_ref(total.0, total.1),
                mapping_range()
            ),
        );
        if let Some(cell) = self.sheet.cells.get_mut(&grade) {
            cell.style = Style::FinalGrade;
        }

        (total, grade)
    }

    fn feedback(&mut self) {
        let report = self.report;
        let Some(text) = report.free_text.as_deref() else {
            return;
        };
        let text = clip_cell_text(text, &report.student.username, "feedback");
        self.row += 1;
        self.section("Feedback");
        let lines = text.lines().count().clamp(1, 40) as u32;
        self.sheet.merge(self.row, 0, self.row + lines - 1, LAST_COL, text.as_str(), Style::Wrapped);
        self.row += lines;
    }

    fn build(mut self) -> (Sheet, StudentCells) {
        self.title();
        let formalities = self.formalities();
        let solution_report = self.solution_report();
        let practical_tasks = self.practical_tasks();
        let (total, grade) = self.final_aggregation(formalities, solution_report, practical_tasks);
        self.feedback();

        (
            self.sheet,
            StudentCells {
                formalities,
                solution_report,
                practical_tasks,
                total,
                grade,
            },
        )
    }
}

/// Cuts `text` to [`MAX_CELL_CHARS`] characters so the cell stays writable.
pub fn clip_cell_text(text: &str, username: &str, field: &str) -> String {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            warn!(
                username,
                field,
                chars = text.chars().count(),
                limit = MAX_CELL_CHARS,
                "Text exceeds the Excel cell limit, truncating"
            );
            text[..end].to_string()
        }
        None => text.to_string(),
    }
}

/// Writes score and max of one task criterion; columns pair up as C/D, E/F.
fn task_cell(sheet: &mut Sheet, row: u32, index: usize, score: f64, criterion: &Criterion) -> String {
    let score_col = COL_SCORE + 2 * index as u16;
    let max_col = score_col + 1;
    sheet.number(row, score_col, score, Style::Score);
    sheet.number(row, max_col, criterion.max, Style::Score);
    ratio_term(&cell_ref(row, score_col), &cell_ref(row, max_col), criterion.weight)
}

fn average_formula(first_row: u32, last_row: u32) -> String {
    format!(
        "AVERAGE({}:{})",
        cell_ref(first_row, COL_HIDDEN),
        cell_ref(last_row, COL_HIDDEN)
    )
}

fn dimension_label(dimension: &Dimension) -> String {
    format!(
        "{}\n(w: {})",
        dimension.name.replace(" & ", " &\n"),
        percent_label(dimension.weight)
    )
}

fn master_sheet() -> Sheet {
    let mut sheet = Sheet::new(MASTER_SHEET);
    sheet.column(0, 15.0);
    sheet.column(1, 20.0);
    sheet.column(2, 20.0);
    for col in MASTER_FORMALITIES_COL..=MASTER_TOTAL_COL {
        sheet.column(col, 18.0);
    }
    sheet.column(MASTER_GRADE_COL, 15.0);

    let headers = [
        "Username",
        "First Name",
        "Last Name",
        "Formalities",
        "Practical Tasks",
        "Solution Report",
        "Total Percentage",
        "Grade",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.text(0, col as u16, *header, Style::Header);
    }
    sheet
}

fn mapping_sheet() -> Sheet {
    let mut sheet = Sheet::new(MAPPING_SHEET);
    sheet.hidden = true;
    for (row, (pct, grade)) in lookup_table().into_iter().enumerate() {
        sheet.number(row as u32, 0, pct, Style::Plain);
        sheet.text(row as u32, 1, grade, Style::Plain);
    }
    sheet
}

/// Lays out the whole report: master sheet, one sheet per student in roster
/// order, and the hidden grade mapping sheet last.
pub fn build_workbook(reports: &[StudentReport]) -> WorkbookModel {
    let mut used: HashSet<String> = [MASTER_SHEET, MAPPING_SHEET]
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    let mut master = master_sheet();
    let mut students = Vec::with_capacity(reports.len());

    for (i, report) in reports.iter().enumerate() {
        let name = sheet_name(&report.student.username, &mut used);
        let (sheet, cells) = StudentSheetWriter::new(name, report).build();

        let row = i as u32 + 1;
        let s = &report.student;
        master.text(row, 0, s.username.clone(), Style::Plain);
        master.text(row, 1, s.first_name.clone(), Style::Plain);
        master.text(row, 2, s.last_name.clone(), Style::Plain);
        for (col, (r, c), style) in [
            (MASTER_FORMALITIES_COL, cells.formalities, Style::Percent),
            (MASTER_PRACTICAL_COL, cells.practical_tasks, Style::Percent),
            (MASTER_SOLUTION_COL, cells.solution_report, Style::Percent),
            (MASTER_TOTAL_COL, cells.total, Style::Percent),
            (MASTER_GRADE_COL, cells.grade, Style::Grade),
        ] {
            master.formula(row, col, sheet_ref(&sheet.name, r, c), style);
        }

        students.push(sheet);
    }

    let mut sheets = Vec::with_capacity(reports.len() + 2);
    sheets.push(master);
    sheets.extend(students);
    sheets.push(mapping_sheet());
    WorkbookModel { sheets }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letter() {
        assert_eq!(col_letter(0), "A");
        assert_eq!(col_letter(8), "I");
        assert_eq!(col_letter(25), "Z");
        assert_eq!(col_letter(26), "AA");
    }

    #[test]
    fn test_sheet_ref_quotes_names() {
        assert_eq!(sheet_ref("alice", 6, 4), "'alice'!E7");
        assert_eq!(sheet_ref("o'neil", 0, 0), "'o''neil'!A1");
    }

    #[test]
    fn test_mapping_range() {
        assert_eq!(mapping_range(), "'GradeMapping'!$A$1:$B$11");
    }

    #[test]
    fn test_sheet_name_sanitizes_and_dedupes() {
        let mut used = HashSet::new();
        assert_eq!(sheet_name("a/b:c", &mut used), "a_b_c");
        assert_eq!(sheet_name("A/B:C", &mut used), "A_B_C~2");

        let long = "x".repeat(40);
        let first = sheet_name(&long, &mut used);
        assert_eq!(first.chars().count(), 31);
        let second = sheet_name(&long, &mut used);
        assert_eq!(second.chars().count(), 31);
        assert!(second.ends_with("~2"));

        assert_eq!(sheet_name("'quoted'", &mut used), "_quoted_");
        assert_eq!(sheet_name("", &mut used), "Student");
    }

    #[test]
    fn test_clip_cell_text() {
        assert_eq!(clip_cell_text("short", "ann", "notes"), "short");

        let exact = "x".repeat(MAX_CELL_CHARS);
        assert_eq!(clip_cell_text(&exact, "ann", "notes"), exact);

        let long = "é".repeat(40_000);
        let clipped = clip_cell_text(&long, "ann", "feedback");
        assert_eq!(clipped.chars().count(), MAX_CELL_CHARS);
        assert!(long.starts_with(&clipped));
    }

    #[test]
    fn test_sheet_name_avoids_reserved() {
        let mut used: HashSet<String> = [MASTER_SHEET.to_lowercase()].into_iter().collect();
        assert_eq!(sheet_name("master overview", &mut used), "master overview~2");
    }
}
