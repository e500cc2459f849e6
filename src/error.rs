use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for atprompt operations
#[derive(Error, Debug)]
pub enum AtpromptError {
    /// Base folder is missing or is not a directory
    #[error("Invalid folder path: {}", .path.display())]
    InvalidFolder { path: PathBuf },

    /// `@url` target could not be fetched (transport failure, timeout or non-success status)
    #[error("Error fetching URL {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Local `@path` target could not be read or decoded as UTF-8
    #[error("Error reading file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// `WalkDir` error when traversing directories
    #[error("Directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The blocking HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Configured CORS origin is not a valid header value
    #[error("Invalid CORS origin: {origin}")]
    InvalidCorsOrigin { origin: String },

    /// IO error outside of target resolution (CLI input and output)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AtpromptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AtpromptError::InvalidFolder {
            path: PathBuf::from("/test/dir"),
        };
        assert_eq!(format!("{err}"), "Invalid folder path: /test/dir");

        let err = AtpromptError::Read {
            path: "nonexistent.txt".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert_eq!(
            format!("{err}"),
            "Error reading file nonexistent.txt: No such file or directory"
        );
    }

    #[test]
    fn test_read_error_keeps_source() {
        use std::error::Error as _;

        let err = AtpromptError::Read {
            path: "a.txt".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let source = err.source().expect("read error should carry its cause");
        assert_eq!(source.to_string(), "denied");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: AtpromptError = io_err.into();
        assert!(matches!(err, AtpromptError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: AtpromptError = json_err.into();
        assert!(matches!(err, AtpromptError::Json(_)));
    }
}
