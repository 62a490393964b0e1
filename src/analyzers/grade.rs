/// Inclusive lower bounds of the grade scale, best grade first.
pub static GRADE_SCALE: &[(f64, &str)] = &[
    (0.95, "1.0"),
    (0.90, "1.3"),
    (0.85, "1.7"),
    (0.80, "2.0"),
    (0.75, "2.3"),
    (0.70, "2.7"),
    (0.65, "3.0"),
    (0.60, "3.3"),
    (0.55, "3.7"),
    (0.50, "4.0"),
];

/// Grade for anything below the last threshold.
pub const FAILING_GRADE: &str = "5.0";

/// Converts a total percentage (0.0–1.0) into a grade.
///
/// | Range       | Grade |
/// |-------------|-------|
/// | >= 0.95     | 1.0   |
/// | >= 0.90     | 1.3   |
/// | >= 0.85     | 1.7   |
/// | >= 0.80     | 2.0   |
/// | >= 0.75     | 2.3   |
/// | >= 0.70     | 2.7   |
/// | >= 0.65     | 3.0   |
/// | >= 0.60     | 3.3   |
/// | >= 0.55     | 3.7   |
/// | >= 0.50     | 4.0   |
/// | < 0.50      | 5.0   |
pub fn grade(p: f64) -> String {
    GRADE_SCALE
        .iter()
        .find(|(threshold, _)| p >= *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or(FAILING_GRADE)
        .into()
}

/// The scale in ascending order with a `0.0` floor, as needed by an
/// approximate-match `VLOOKUP`.
pub fn lookup_table() -> Vec<(f64, &'static str)> {
    let mut table = vec![(0.0, FAILING_GRADE)];
    table.extend(GRADE_SCALE.iter().rev().copied());
    table
}
