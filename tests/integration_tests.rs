use grade_report::analyzers::analyzer::{GradingOptions, grade_course};
use grade_report::config::Overrides;
use grade_report::report::formula::{Evaluator, Value};
use grade_report::report::layout::{
    MASTER_GRADE_COL, MASTER_SHEET, MASTER_TOTAL_COL, MAX_CELL_CHARS, cell_ref,
};
use grade_report::report::{audit, build_workbook, write_workbook};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::TempDir;

const ROSTER: &str = "Username;First name;Last name;Status\n\
    alice;Alice;Smith;autor\n\
    bob;Bob;Jones;accepted\n\
    tutor1;Tom;Tutor;tutor\n\
    carol;Carol;Nowak;autor\n\
    dora;Dóra;Kovács;autor\n";

const TASK_HEADER: &str = "Task,practicalTaskCorrect,practicalTaskDetails,\
    approachCorrect,approachConvincing,approachReferences,\
    situationalityCorrect,situationalityConvincing,situationalityReferences,\
    implicationsCorrect,implicationsConvincing,implicationsReferences\n";

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn all_max_other() -> String {
    let mut csv = String::from(
        "Category,Item,Score,Notes\n\
         Overall,Formatting,2,\n\
         Overall,Structure,2,\n\
         Overall,Style/Language,2,\n",
    );
    for dim in ["Approach", "Context & Situationality", "Implications"] {
        csv.push_str(&format!("Solution Report,{dim} - Correctness,2,\n"));
        csv.push_str(&format!("Solution Report,{dim} - Convincingness,2,\n"));
        csv.push_str(&format!("Solution Report,{dim} - References,1,\n"));
    }
    csv
}

/// alice: exact files, all max scores, feedback text.
/// bob: fuzzy-named tasks file only, so the Solution Report uses the task fallback.
/// carol: no files.
/// dora: diacritics in the name, fuzzy-named rubric with partial scores.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path();

    write(p, "students.csv", ROSTER);

    write(p, "alice-other.csv", &all_max_other());
    write(
        p,
        "alice-tasks.csv",
        &format!("{TASK_HEADER}T1,2,1,,,,,,,,,\nT2,2,1,,,,,,,,,\n"),
    );
    write(p, "alice.txt", "Excellent work.\nVery thorough.\n");

    write(
        p,
        "Jones-Bob-tasks.csv",
        &format!(
            "{TASK_HEADER}\
             T1,2,0.5,2,1,1,1,1,0,0.5,2,1\n\
             T2,1,1,1,n/a,0,2,2,1,,,\n\
             T3,0,0,0,0,0,0,0,0,0,0,0\n"
        ),
    );

    write(
        p,
        "Kovacs-Dora-other.csv",
        "Category,Item,Score,Notes\n\
         Overall,Formatting,1.5,\"Margins, fonts\"\n\
         Overall,Structure,1,\n\
         Solution Report,Approach - Correctness,1.5,\n\
         Solution Report,Approach - Convincingness,1,\n\
         Solution Report,Implications - References,0.5,\n\
         Solution Report,Context & Situationality - Correctness,7,out of range\n",
    );
    write(
        p,
        "Kovacs-Dora-tasks.csv",
        &format!("{TASK_HEADER}T1,1.5,0.5,,,,,,,,,\n"),
    );

    dir
}

/// Contents of one part of a written xlsx archive.
fn archive_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
    content
}

/// Cached `<v>` value of cell `reference` in a worksheet part.
fn cached_value(sheet_xml: &str, reference: &str) -> Option<String> {
    let start = sheet_xml.find(&format!(r#"<c r="{reference}""#))?;
    let cell = &sheet_xml[start..];
    let cell = &cell[..cell.find("</c>")?];
    let value = cell.find("<v>")? + "<v>".len();
    let end = cell.find("</v>")?;
    Some(cell[value..end].to_string())
}

fn options() -> GradingOptions {
    GradingOptions {
        overrides: Overrides::empty(),
        ..Default::default()
    }
}

#[test]
fn test_full_pipeline() {
    let dir = fixture();
    let reports = grade_course(dir.path(), &options()).unwrap();

    let names: Vec<_> = reports.iter().map(|r| r.student.username.as_str()).collect();
    assert_eq!(names, ["alice", "bob", "carol", "dora"]);

    let alice = &reports[0];
    assert_eq!(alice.result.total_pct, 1.0);
    assert_eq!(alice.result.letter_grade, "1.0");
    assert_eq!(alice.free_text.as_deref(), Some("Excellent work.\nVery thorough.\n"));

    let bob = &reports[1];
    assert!(bob.files.other.is_none());
    assert!(bob.files.tasks.is_some());
    assert_eq!(bob.result.formalities_pct, 0.0);
    assert!(bob.result.solution_report_pct > 0.0);

    let carol = &reports[2];
    assert!(carol.files.is_empty());
    assert_eq!(carol.result.total_pct, 0.0);
    assert_eq!(carol.result.letter_grade, "5.0");

    let dora = &reports[3];
    assert!(dora.files.other.is_some());
    assert!(dora.result.total_pct > 0.0 && dora.result.total_pct < 1.0);
}

#[test]
fn test_workbook_formulas_match_computed_results() {
    let dir = fixture();
    let reports = grade_course(dir.path(), &options()).unwrap();
    let model = build_workbook(&reports);

    assert!(audit(&model, &reports).is_empty());

    let evaluator = Evaluator::new(&model);
    for (i, report) in reports.iter().enumerate() {
        let row = i as u32 + 1;
        assert_eq!(
            evaluator.cell_value(MASTER_SHEET, row, MASTER_TOTAL_COL).unwrap(),
            Value::Number(report.result.total_pct),
            "total of {}",
            report.student.username
        );
        assert_eq!(
            evaluator.cell_value(MASTER_SHEET, row, MASTER_GRADE_COL).unwrap(),
            Value::Text(report.result.letter_grade.clone()),
            "grade of {}",
            report.student.username
        );
    }
}

#[test]
fn test_workbook_sheets() {
    let dir = fixture();
    let reports = grade_course(dir.path(), &options()).unwrap();
    let model = build_workbook(&reports);

    let names: Vec<_> = model.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        ["Master Overview", "alice", "bob", "carol", "dora", "GradeMapping"]
    );
    assert!(model.sheet("GradeMapping").unwrap().hidden);
    assert!(!model.sheet("alice").unwrap().hidden);
}

#[test]
fn test_write_workbook_to_disk() {
    let dir = fixture();
    let reports = grade_course(dir.path(), &options()).unwrap();
    let out = dir.path().join("grades_output.xlsx");

    write_workbook(&out, &reports).unwrap();

    let bytes = fs::read(&out).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_written_workbook_caches_results() {
    let dir = fixture();
    let reports = grade_course(dir.path(), &options()).unwrap();
    let out = dir.path().join("grades_output.xlsx");
    write_workbook(&out, &reports).unwrap();

    // the master sheet is written first
    let master = archive_part(&fs::read(&out).unwrap(), "xl/worksheets/sheet1.xml");
    for (i, report) in reports.iter().enumerate() {
        let row = i as u32 + 1;
        let total = cached_value(&master, &cell_ref(row, MASTER_TOTAL_COL)).unwrap();
        assert_eq!(
            total.parse::<f64>().unwrap(),
            report.result.total_pct,
            "total of {}",
            report.student.username
        );
        let grade = cached_value(&master, &cell_ref(row, MASTER_GRADE_COL)).unwrap();
        assert_eq!(grade, report.result.letter_grade, "grade of {}", report.student.username);
    }
}

#[test]
fn test_oversized_feedback_is_truncated() {
    let dir = fixture();
    write(dir.path(), "alice.txt", &"x".repeat(40_000));
    let reports = grade_course(dir.path(), &options()).unwrap();
    assert_eq!(reports[0].free_text.as_deref().map(str::len), Some(40_000));

    let model = build_workbook(&reports);
    let alice = model.sheet("alice").unwrap();
    let feedback = alice
        .merges
        .iter()
        .find(|m| m.text.starts_with("xxx"))
        .unwrap();
    assert_eq!(feedback.text.chars().count(), MAX_CELL_CHARS);

    let out = dir.path().join("grades_output.xlsx");
    write_workbook(&out, &reports).unwrap();
    assert!(out.is_file());
}

#[test]
fn test_missing_roster_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let err = grade_course(dir.path(), &options()).unwrap_err();
    assert!(err.to_string().contains("students.csv"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_demo_override() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path();
    write(
        p,
        "example-students.csv",
        "Username;First name;Last name;Status\njakbrz;Jakub;Brzeczyszczykiewicz;autor\n",
    );
    write(p, "example-grading-other.csv", &all_max_other());
    write(
        p,
        "example-grading-tasks.csv",
        &format!("{TASK_HEADER}T1,2,1,,,,,,,,,\n"),
    );

    let reports = grade_course(p, &GradingOptions::default()).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].result.total_pct, 1.0);
    assert_eq!(reports[0].result.letter_grade, "1.0");
}
