//! Locates the optional grading files of a student.
//!
//! Grader output follows `{username}-other.csv`, `{username}-tasks.csv` and
//! `{username}.txt` when things go well. When none of those exist the
//! directory is scanned for files starting with the transliterated
//! `{last}-{first}` name instead.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Overrides;

/// The three kinds of per-student input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Other,
    Tasks,
    Text,
}

impl FileKind {
    /// Classifies a lowercased file name by its suffix.
    fn classify(name: &str) -> Option<Self> {
        if name.ends_with("-other.csv") {
            Some(Self::Other)
        } else if name.ends_with("-tasks.csv") {
            Some(Self::Tasks)
        } else if name.ends_with(".txt") {
            Some(Self::Text)
        } else {
            None
        }
    }
}

/// Several fallback candidates for one file kind; the first one was used.
#[derive(Debug, Clone, PartialEq)]
pub struct Ambiguity {
    pub kind: FileKind,
    pub candidates: Vec<PathBuf>,
}

/// Files found for one student. Every slot is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradingFiles {
    pub other: Option<PathBuf>,
    pub tasks: Option<PathBuf>,
    pub text: Option<PathBuf>,
    pub ambiguities: Vec<Ambiguity>,
}

impl GradingFiles {
    pub fn is_empty(&self) -> bool {
        self.other.is_none() && self.tasks.is_none() && self.text.is_none()
    }

    fn slot(&mut self, kind: FileKind) -> &mut Option<PathBuf> {
        match kind {
            FileKind::Other => &mut self.other,
            FileKind::Tasks => &mut self.tasks,
            FileKind::Text => &mut self.text,
        }
    }
}

/// ASCII-transliterated, lowercased form used for name matching.
pub fn normalize(name: &str) -> String {
    deunicode::deunicode(name).to_lowercase()
}

fn existing_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Resolves the grading files of one student in `base_dir`.
///
/// Exact username files win outright, even if only some of them exist.
/// Otherwise every regular file whose normalized name starts with
/// `{last}-{first}` is classified by suffix; among several candidates of one
/// kind the lexicographically smallest name is used and the ambiguity is
/// recorded. Never fails: unreadable directories just yield nothing.
#[tracing::instrument(skip(base_dir), fields(dir = %base_dir.display()))]
pub fn resolve(base_dir: &Path, username: &str, first_name: &str, last_name: &str) -> GradingFiles {
    let exact = GradingFiles {
        other: existing_file(base_dir.join(format!("{username}-other.csv"))),
        tasks: existing_file(base_dir.join(format!("{username}-tasks.csv"))),
        text: existing_file(base_dir.join(format!("{username}.txt"))),
        ambiguities: Vec::new(),
    };
    if !exact.is_empty() {
        debug!("Resolved grading files by username");
        return exact;
    }

    let prefix = normalize(&format!("{last_name}-{first_name}"));
    let entries = match fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, "Cannot list input directory");
            return GradingFiles::default();
        }
    };

    let mut candidates: Vec<(FileKind, String, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let normalized = normalize(&file_name);
        if !normalized.starts_with(&prefix) {
            continue;
        }
        if let Some(kind) = FileKind::classify(&normalized) {
            candidates.push((kind, file_name, entry.path()));
        }
    }
    candidates.sort_by(|a, b| a.1.cmp(&b.1));

    let mut files = GradingFiles::default();
    for kind in [FileKind::Other, FileKind::Tasks, FileKind::Text] {
        let matches: Vec<PathBuf> = candidates
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, path)| path.clone())
            .collect();
        if matches.len() > 1 {
            warn!(
                ?kind,
                candidates = ?matches,
                chosen = %matches[0].display(),
                "Several files match the student name, using the first"
            );
            files.ambiguities.push(Ambiguity {
                kind,
                candidates: matches.clone(),
            });
        }
        *files.slot(kind) = matches.into_iter().next();
    }

    if !files.is_empty() {
        debug!(%prefix, "Resolved grading files by name");
    }
    files
}

/// Resolves grading files and then applies per-user overrides.
pub struct Resolver<'a> {
    base_dir: &'a Path,
    overrides: &'a Overrides,
}

impl<'a> Resolver<'a> {
    pub fn new(base_dir: &'a Path, overrides: &'a Overrides) -> Self {
        Self {
            base_dir,
            overrides,
        }
    }

    /// Like [`resolve`], but a configured override file that exists replaces
    /// whatever was found for its slot.
    pub fn resolve(&self, username: &str, first_name: &str, last_name: &str) -> GradingFiles {
        let mut files = resolve(self.base_dir, username, first_name, last_name);

        if let Some(config) = self.overrides.get(username) {
            for (kind, name) in [
                (FileKind::Other, &config.other),
                (FileKind::Tasks, &config.tasks),
                (FileKind::Text, &config.text),
            ] {
                let Some(name) = name else { continue };
                if let Some(path) = existing_file(self.base_dir.join(name)) {
                    debug!(username, ?kind, path = %path.display(), "Using override file");
                    *files.slot(kind) = Some(path);
                }
            }
        }

        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with(files: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        dir
    }

    #[test]
    fn test_exact_username_files() {
        let dir = dir_with(&["alice-other.csv", "alice-tasks.csv"]);
        let files = resolve(dir.path(), "alice", "Alice", "Smith");

        assert_eq!(files.other, Some(dir.path().join("alice-other.csv")));
        assert_eq!(files.tasks, Some(dir.path().join("alice-tasks.csv")));
        assert_eq!(files.text, None);
    }

    #[test]
    fn test_exact_match_does_not_mix_in_fallback() {
        let dir = dir_with(&["alice-other.csv", "Smith-Alice-tasks.csv"]);
        let files = resolve(dir.path(), "alice", "Alice", "Smith");

        assert!(files.other.is_some());
        assert_eq!(files.tasks, None);
    }

    #[test]
    fn test_fallback_by_name() {
        let dir = dir_with(&["Smith-Alice-other.csv"]);
        let files = resolve(dir.path(), "alice", "Alice", "Smith");

        assert_eq!(files.other, Some(dir.path().join("Smith-Alice-other.csv")));
        assert_eq!(files.tasks, None);
        assert_eq!(files.text, None);
    }

    #[test]
    fn test_fallback_transliterates_diacritics() {
        let dir = dir_with(&["Muller-Jorg-tasks.csv", "müller-jörg_feedback.txt"]);
        let files = resolve(dir.path(), "jm", "Jörg", "Müller");

        assert_eq!(files.tasks, Some(dir.path().join("Muller-Jorg-tasks.csv")));
        assert_eq!(files.text, Some(dir.path().join("müller-jörg_feedback.txt")));
    }

    #[test]
    fn test_fallback_ignores_other_students() {
        let dir = dir_with(&["Jones-Bob-other.csv", "notes.txt"]);
        let files = resolve(dir.path(), "alice", "Alice", "Smith");
        assert!(files.is_empty());
    }

    #[test]
    fn test_ambiguous_fallback_picks_smallest_name() {
        let dir = dir_with(&["smith-alice-v2-other.csv", "Smith-Alice-other.csv"]);
        let files = resolve(dir.path(), "alice", "Alice", "Smith");

        assert_eq!(files.other, Some(dir.path().join("Smith-Alice-other.csv")));
        assert_eq!(files.ambiguities.len(), 1);
        assert_eq!(files.ambiguities[0].kind, FileKind::Other);
        assert_eq!(files.ambiguities[0].candidates.len(), 2);
    }

    #[test]
    fn test_directories_are_not_matched() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("smith-alice.txt")).unwrap();
        let files = resolve(dir.path(), "alice", "Alice", "Smith");
        assert!(files.is_empty());
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let files = resolve(Path::new("/definitely/not/here"), "alice", "Alice", "Smith");
        assert!(files.is_empty());
    }

    #[test]
    fn test_demo_override_replaces_found_files() {
        let dir = dir_with(&[
            "jakbrz-other.csv",
            "example-grading-other.csv",
            "example-grading-tasks.csv",
        ]);
        let overrides = Overrides::default();
        let files = Resolver::new(dir.path(), &overrides).resolve("jakbrz", "Jakub", "Brz");

        assert_eq!(files.other, Some(dir.path().join("example-grading-other.csv")));
        assert_eq!(files.tasks, Some(dir.path().join("example-grading-tasks.csv")));
    }

    #[test]
    fn test_override_only_applies_when_file_exists() {
        let dir = dir_with(&["jakbrz-other.csv"]);
        let overrides = Overrides::default();
        let files = Resolver::new(dir.path(), &overrides).resolve("jakbrz", "Jakub", "Brz");

        assert_eq!(files.other, Some(dir.path().join("jakbrz-other.csv")));
        assert_eq!(files.tasks, None);
    }

    #[test]
    fn test_override_is_per_user() {
        let dir = dir_with(&["example-grading-other.csv"]);
        let overrides = Overrides::default();
        let files = Resolver::new(dir.path(), &overrides).resolve("alice", "Alice", "Smith");
        assert!(files.is_empty());
    }
}
