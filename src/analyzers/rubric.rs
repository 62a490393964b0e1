//! Fixed rubric weights shared by the aggregator and the workbook formulas.
//!
//! Every constant that influences a percentage lives here, so the native
//! computation in [`crate::analyzers::aggregate`] and the spreadsheet formulas
//! in [`crate::report::layout`] are generated from the same numbers.

/// A single scored rubric line: raw points out of `max`, weighted by `weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Criterion {
    pub label: &'static str,
    pub max: f64,
    pub weight: f64,
}

/// A formalities line, looked up by item name in the `Overall` category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormalityLine {
    pub item: &'static str,
    pub criterion: Criterion,
}

/// The three Solution Report dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Approach,
    Situationality,
    Implications,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension {
    pub kind: DimensionKind,
    /// Display name, also the item prefix in the "other" table.
    pub name: &'static str,
    pub weight: f64,
}

/// Category weights of the final total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryWeights {
    pub formalities: f64,
    pub practical_tasks: f64,
    pub solution_report: f64,
}

pub const FORMALITIES_CATEGORY: &str = "Overall";
pub const SOLUTION_REPORT_CATEGORY: &str = "Solution Report";

pub const FORMALITIES: [FormalityLine; 3] = [
    FormalityLine {
        item: "Formatting",
        criterion: Criterion {
            label: "Formatting",
            max: 2.0,
            weight: 0.30,
        },
    },
    FormalityLine {
        item: "Structure",
        criterion: Criterion {
            label: "Structure",
            max: 2.0,
            weight: 0.50,
        },
    },
    FormalityLine {
        item: "Style/Language",
        criterion: Criterion {
            label: "Style/Language",
            max: 2.0,
            weight: 0.20,
        },
    },
];

pub const DIMENSIONS: [Dimension; 3] = [
    Dimension {
        kind: DimensionKind::Approach,
        name: "Approach",
        weight: 0.50,
    },
    Dimension {
        kind: DimensionKind::Situationality,
        name: "Context & Situationality",
        weight: 0.25,
    },
    Dimension {
        kind: DimensionKind::Implications,
        name: "Implications",
        weight: 0.25,
    },
];

/// Correctness, convincingness, references; in that order everywhere.
pub const DIMENSION_CRITERIA: [Criterion; 3] = [
    Criterion {
        label: "Correctness",
        max: 2.0,
        weight: 0.50,
    },
    Criterion {
        label: "Convincingness",
        max: 2.0,
        weight: 0.35,
    },
    Criterion {
        label: "References",
        max: 1.0,
        weight: 0.15,
    },
];

/// Correctness, detail; in that order everywhere.
pub const TASK_CRITERIA: [Criterion; 2] = [
    Criterion {
        label: "Correctness",
        max: 2.0,
        weight: 0.65,
    },
    Criterion {
        label: "Detail",
        max: 1.0,
        weight: 0.35,
    },
];

pub const CATEGORY_WEIGHTS: CategoryWeights = CategoryWeights {
    formalities: 0.20,
    practical_tasks: 0.40,
    solution_report: 0.40,
};

impl Dimension {
    /// Item name of one sub-criterion in the "other" table,
    /// e.g. `Context & Situationality - References`.
    pub fn item(&self, criterion: &Criterion) -> String {
        format!("{} - {}", self.name, criterion.label)
    }
}

/// Renders a weight as a whole percentage label, e.g. `0.35` -> `35%`.
pub fn percent_label(weight: f64) -> String {
    format!("{:.0}%", weight * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_sum(criteria: &[Criterion]) -> f64 {
        criteria.iter().map(|c| c.weight).sum()
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!((weight_sum(&DIMENSION_CRITERIA) - 1.0).abs() < 1e-12);
        assert!((weight_sum(&TASK_CRITERIA) - 1.0).abs() < 1e-12);

        let formalities: f64 = FORMALITIES.iter().map(|f| f.criterion.weight).sum();
        assert!((formalities - 1.0).abs() < 1e-12);

        let dims: f64 = DIMENSIONS.iter().map(|d| d.weight).sum();
        assert!((dims - 1.0).abs() < 1e-12);

        let c = CATEGORY_WEIGHTS;
        assert!((c.formalities + c.practical_tasks + c.solution_report - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_item_names() {
        assert_eq!(
            DIMENSIONS[1].item(&DIMENSION_CRITERIA[2]),
            "Context & Situationality - References"
        );
        assert_eq!(
            DIMENSIONS[0].item(&DIMENSION_CRITERIA[0]),
            "Approach - Correctness"
        );
    }

    #[test]
    fn test_percent_label() {
        assert_eq!(percent_label(0.35), "35%");
        assert_eq!(percent_label(0.2), "20%");
    }
}
