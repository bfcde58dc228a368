//! Ignore list with per-path memoized verdicts.

use resmod_util::fs::file_name_lossy;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Names skipped when no ignore list is configured.
pub const DEFAULT_IGNORE: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".DS_Store",
    "*.DS_Store",
    "Thumbs.db",
    "coverage",
    "tmp",
    "temp",
    ".nyc_output",
    ".idea",
    ".vscode",
];

/// Name patterns excluded from the search.
///
/// Patterns are globs tested against the final path component. Each
/// absolute path is evaluated once; later checks hit the cache.
#[derive(Debug)]
pub struct Ignore {
    patterns: Vec<glob::Pattern>,
    verdicts: RefCell<HashMap<PathBuf, bool>>,
}

impl Default for Ignore {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE.iter().copied())
    }
}

impl Ignore {
    /// Build from patterns; invalid globs are skipped with a warning.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref();
                glob::Pattern::new(p)
                    .map_err(|e| warn!(pattern = p, error = %e, "skipping invalid ignore pattern"))
                    .ok()
            })
            .collect();
        Self {
            patterns,
            verdicts: RefCell::new(HashMap::new()),
        }
    }

    /// The configured list, or the default list when `None`.
    pub fn from_option(patterns: Option<&[String]>) -> Self {
        match patterns {
            Some(p) => Self::new(p),
            None => Self::default(),
        }
    }

    /// True if `path` (absolute) is excluded.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if let Some(&verdict) = self.verdicts.borrow().get(path) {
            return verdict;
        }
        let verdict = file_name_lossy(path)
            .is_some_and(|name| self.patterns.iter().any(|p| p.matches(&name)));
        self.verdicts.borrow_mut().insert(path.to_path_buf(), verdict);
        verdict
    }

    /// Number of memoized verdicts.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.verdicts.borrow().len()
    }

    /// Forget memoized verdicts.
    pub fn clear(&self) {
        self.verdicts.borrow_mut().clear();
    }
}
