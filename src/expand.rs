use crate::error::Result;
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, Fetcher};
use crate::fs_utils::{ensure_folder, folder_structure, read_file_contents};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Marker that introduces a reference token
pub const REFERENCE_MARKER: char = '@';

/// Target that expands to the ignore-aware listing of the base folder
pub const FOLDER_STRUCTURE: &str = "folder_structure";

/// Configuration for prompt expansion
#[derive(Debug, Clone)]
pub struct ExpandConfig {
    /// Folder that local targets and `@folder_structure` resolve against
    pub base_dir: PathBuf,
    /// Timeout for each `@url` fetch
    pub fetch_timeout: Duration,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl ExpandConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }
}

/// What an `@` token points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    FolderStructure,
    Url(&'a str),
    LocalPath(&'a str),
}

impl<'a> Target<'a> {
    /// Classifies a token payload (the text after `@`); the first matching kind wins
    pub fn classify(target: &'a str) -> Self {
        if target == FOLDER_STRUCTURE {
            Self::FolderStructure
        } else if target.starts_with("http://") || target.starts_with("https://") {
            Self::Url(target)
        } else {
            Self::LocalPath(target)
        }
    }
}

/// Returns the payloads of every `@` token in `input_text`, in order
pub fn find_references(input_text: &str) -> Vec<&str> {
    input_text
        .split_whitespace()
        .filter_map(|token| token.strip_prefix(REFERENCE_MARKER))
        .collect()
}

pub fn file_block(path: &str, contents: &str) -> String {
    format!("\n<file>#{path}\n{contents}\n</file>\n")
}

pub fn web_page_block(url: &str, contents: &str) -> String {
    format!("\n<web_page>#{url}\n{contents}\n</web_page>\n")
}

pub fn folder_structure_block(paths: &[String]) -> String {
    format!(
        "\n<folder_structure>\n{}\n</folder_structure>\n",
        paths.join("\n")
    )
}

/// Owns the HTTP client for one expansion; built on the first `@url` only
struct LazyFetcher {
    timeout: Duration,
    fetcher: Option<Fetcher>,
}

impl LazyFetcher {
    fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            fetcher: None,
        }
    }

    fn get(&mut self) -> Result<&Fetcher> {
        let fetcher = match self.fetcher.take() {
            Some(fetcher) => fetcher,
            None => Fetcher::new(self.timeout)?,
        };
        Ok(self.fetcher.insert(fetcher))
    }
}

/// Resolves a single target payload into its expanded block
///
/// # Errors
///
/// - `AtpromptError::InvalidFolder` for `@folder_structure` on a bad base folder.
/// - `AtpromptError::Fetch` if a URL can't be fetched.
/// - `AtpromptError::Read` if a local file can't be read.
pub fn resolve_target(target: &str, config: &ExpandConfig) -> Result<String> {
    resolve_with(
        Target::classify(target),
        &config.base_dir,
        &mut LazyFetcher::new(config.fetch_timeout),
    )
}

fn resolve_with(target: Target<'_>, base_dir: &Path, fetcher: &mut LazyFetcher) -> Result<String> {
    match target {
        Target::FolderStructure => Ok(folder_structure_block(&folder_structure(base_dir)?)),
        Target::Url(url) => {
            let body = fetcher.get()?.fetch(url)?;
            Ok(web_page_block(url, &body))
        }
        Target::LocalPath(path) => {
            let contents = read_file_contents(base_dir, path)?;
            Ok(file_block(path, &contents))
        }
    }
}

/// Expands every `@` token in `input_text`
///
/// Tokens are resolved left to right and rejoined with single spaces, so
/// runs of whitespace in the input collapse. The first failing token aborts
/// the whole expansion.
///
/// # Errors
///
/// - `AtpromptError::InvalidFolder` if the base folder isn't a directory,
///   checked before any token is looked at.
/// - Any error from [`resolve_target`] for the first token that fails.
pub fn expand_prompt(input_text: &str, config: &ExpandConfig) -> Result<String> {
    ensure_folder(&config.base_dir)?;

    let mut fetcher = LazyFetcher::new(config.fetch_timeout);
    let mut words = Vec::new();

    for token in input_text.split_whitespace() {
        match token.strip_prefix(REFERENCE_MARKER) {
            Some(payload) => {
                let target = Target::classify(payload);
                tracing::debug!(?target, "resolving reference");
                words.push(resolve_with(target, &config.base_dir, &mut fetcher)?);
            }
            None => words.push(token.to_string()),
        }
    }

    Ok(words.join(" "))
}
