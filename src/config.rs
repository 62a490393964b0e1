//! Per-user file overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Fixed file names used for one username instead of the discovered ones.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OverrideFiles {
    #[serde(default)]
    pub other: Option<String>,
    #[serde(default)]
    pub tasks: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Maps usernames to fixed grading file names.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "jakbrz": { "other": "example-grading-other.csv", "tasks": "example-grading-tasks.csv" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Overrides {
    entries: HashMap<String, OverrideFiles>,
}

/// Username of the bundled demo data.
pub const DEMO_USERNAME: &str = "jakbrz";

impl Default for Overrides {
    /// Points the demo user at the bundled example files.
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            DEMO_USERNAME.to_string(),
            OverrideFiles {
                other: Some("example-grading-other.csv".into()),
                tasks: Some("example-grading-tasks.csv".into()),
                text: None,
            },
        );
        Self { entries }
    }
}

impl Overrides {
    /// No overrides at all.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Loads the overrides from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read overrides file {}", path.display()))?;
        let entries: HashMap<String, OverrideFiles> = serde_json::from_str(&content)
            .with_context(|| format!("invalid overrides file {}", path.display()))?;
        Ok(Self { entries })
    }

    /// Returns the configured files for `username`, if any.
    pub fn get(&self, username: &str) -> Option<&OverrideFiles> {
        self.entries.get(username)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Roster statuses kept when the roster has a `Status` column.
pub const DEFAULT_ALLOWED_STATUSES: &[&str] = &["autor", "accepted"];
