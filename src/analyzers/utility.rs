use crate::analyzers::rubric::Criterion;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sum(values.iter().copied()) / values.len() as f64
}

/// Left-to-right sum starting at 0.0, the same order a spreadsheet `SUM` uses.
pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| acc + v)
}

/// Sum of `(score / max) * weight` over paired scores and criteria.
pub fn weighted_pct(scores: &[f64], criteria: &[Criterion]) -> f64 {
    sum(scores
        .iter()
        .zip(criteria)
        .map(|(score, c)| (score / c.max) * c.weight))
}

/// Clamps a raw sub-score to a usable number: absent, non-finite or
/// outside `[0, max]` becomes 0.0.
pub fn sanitize(score: Option<f64>, max: f64) -> f64 {
    match score {
        Some(s) if s.is_finite() && (0.0..=max).contains(&s) => s,
        _ => 0.0,
    }
}
