use crate::error::{AtpromptError, Result};
use crate::ignore_rules::IgnoreRules;
use std::fs;
use std::path::{Component, Path};
use walkdir::{DirEntry, WalkDir};

/// File extensions (lowercase, without the dot) listed by [`list_files`]
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "csv", "py", "js", "css", "html", "yml", "yaml", "xml", "ini", "conf",
    "sh", "bat",
];

/// Checks that `path` exists and is a directory
///
/// # Errors
///
/// Returns `AtpromptError::InvalidFolder` otherwise.
pub fn ensure_folder(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(AtpromptError::InvalidFolder {
            path: path.to_path_buf(),
        })
    }
}

/// Reads the file at `relative` (resolved against `base_dir`) as UTF-8 text
///
/// # Errors
///
/// Returns `AtpromptError::Read` naming `relative` if the file is missing,
/// unreadable, a directory, or not valid UTF-8.
pub fn read_file_contents(base_dir: &Path, relative: &str) -> Result<String> {
    fs::read_to_string(base_dir.join(relative)).map_err(|source| AtpromptError::Read {
        path: relative.to_string(),
        source,
    })
}

/// Lists every file under `root` with a supported extension, sorted
///
/// # Errors
///
/// - `AtpromptError::InvalidFolder` if `root` isn't a directory.
/// - `AtpromptError::Walk` if the root itself can't be traversed.
///
/// Unreadable entries below the root are logged and skipped.
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    ensure_folder(root)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let Some(entry) = readable(entry)? else {
            continue;
        };
        if is_listed_file(&entry) && has_supported_extension(entry.path()) {
            files.push(relative_path_string(root, entry.path()));
        }
    }

    files.sort();
    Ok(files)
}

/// Lists every file under `root` that survives the ignore rules, sorted
///
/// Ignored directories are pruned by name before they are entered; files
/// are tested by their path relative to `root`.
///
/// # Errors
///
/// - `AtpromptError::InvalidFolder` if `root` isn't a directory.
/// - `AtpromptError::Read` if the root `.gitignore` can't be read.
/// - `AtpromptError::Walk` if the root itself can't be traversed.
///
/// Unreadable entries below the root are logged and skipped.
pub fn folder_structure(root: &Path) -> Result<Vec<String>> {
    ensure_folder(root)?;
    let rules = IgnoreRules::load(root)?;

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !rules.is_ignored(Path::new(entry.file_name()))
    });

    let mut files = Vec::new();
    for entry in walker {
        let Some(entry) = readable(entry)? else {
            continue;
        };
        if !is_listed_file(&entry) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if rules.is_ignored(relative) {
            tracing::trace!(path = %relative.display(), "ignored");
            continue;
        }
        files.push(relative_path_string(root, entry.path()));
    }

    files.sort();
    Ok(files)
}

/// Renders `path` relative to `root` with `/` separators
pub fn relative_path_string(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn readable(entry: walkdir::Result<DirEntry>) -> Result<Option<DirEntry>> {
    match entry {
        Ok(entry) => Ok(Some(entry)),
        Err(e) if e.depth() > 0 => {
            tracing::warn!(error = %e, "skipping unreadable entry");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

// Symlinks are not followed; a link to a file still counts as a file.
fn is_listed_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}
