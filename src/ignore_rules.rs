//! Ignore rules for the `@folder_structure` listing.
//!
//! Matching is a deliberately small subset of gitignore syntax. A pattern is
//! one of:
//!
//! - `*suffix` - the relative path ends with `suffix` (`*.pyc`)
//! - `prefix/*` - some leading run of path segments equals `prefix` (`build/*`)
//! - anything else - equals one path segment, or the whole relative path
//!
//! Trailing separators are stripped first, so `build/` behaves like `build`.
//! There is no negation and no anchoring to the root.

use crate::error::{AtpromptError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path};

/// Patterns that are always ignored, whether or not the root has a `.gitignore`
pub const BUILTIN_PATTERNS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "node_modules",
    "venv",
    ".venv",
    "*.pyc",
    "*.pyo",
    "*.egg-info",
    ".DS_Store",
];

/// Name of the per-root ignore file
pub const GITIGNORE_FILE: &str = ".gitignore";

/// An unordered set of ignore patterns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    patterns: HashSet<String>,
}

impl IgnoreRules {
    /// Rules containing only [`BUILTIN_PATTERNS`]
    pub fn builtin() -> Self {
        Self::default().with_patterns(BUILTIN_PATTERNS.iter().copied())
    }

    /// Returns a copy of these rules with `patterns` added
    #[must_use]
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Built-in rules merged with the `.gitignore` at `root`, if there is one
    ///
    /// # Errors
    ///
    /// Returns `AtpromptError::Read` if `.gitignore` exists but cannot be read.
    pub fn load(root: &Path) -> Result<Self> {
        let gitignore = root.join(GITIGNORE_FILE);
        let rules = Self::builtin();
        if !gitignore.is_file() {
            return Ok(rules);
        }

        let content = fs::read_to_string(&gitignore).map_err(|source| AtpromptError::Read {
            path: GITIGNORE_FILE.to_string(),
            source,
        })?;
        let extra: Vec<&str> = parse_gitignore(&content).collect();
        tracing::debug!(
            root = %root.display(),
            patterns = extra.len(),
            "loaded .gitignore"
        );

        Ok(rules.with_patterns(extra))
    }

    /// Whether `path` (relative to the walk root) matches any of these rules
    pub fn is_ignored(&self, path: &Path) -> bool {
        should_ignore(path, &self.patterns)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.patterns.len()
    }

    #[cfg(test)]
    fn contains(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern)
    }
}

/// Yields the patterns of a `.gitignore` file: trimmed lines, minus blanks and `#` comments
pub fn parse_gitignore(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Returns true if any pattern matches `path`
pub fn should_ignore<I, S>(path: &Path, patterns: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let segments = path_segments(path);
    let full = segments.join("/");

    patterns
        .into_iter()
        .any(|pattern| pattern_matches(pattern.as_ref(), &segments, &full))
}

fn pattern_matches(pattern: &str, segments: &[String], full: &str) -> bool {
    let pattern = pattern.trim_end_matches(['/', '\\']);
    if pattern.is_empty() {
        return false;
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        full.ends_with(suffix)
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        let prefix = prefix.trim_end_matches(['/', '\\']);
        // proper prefixes only: the directory itself is not matched, its contents are
        (1..segments.len()).any(|len| segments[..len].join("/") == prefix)
    } else {
        segments.iter().any(|segment| segment == pattern) || full == pattern
    }
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
