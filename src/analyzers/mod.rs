//! Score aggregation and grading.
//!
//! This module holds the shared rubric weights, the per-student aggregation
//! of sub-scores into category percentages, the grade scale, and the
//! pipeline that walks the roster.

pub mod aggregate;
pub mod analyzer;
pub mod grade;
pub mod rubric;
pub mod types;
pub mod utility;
