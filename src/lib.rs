//! # atprompt
//!
//! Prompt assembly for Large Language Models. Text containing `@` references
//! is expanded in place into tagged blocks of inlined content, and the same
//! engine is served over a small local HTTP API.
//!
//! ## References
//!
//! - `@path/to/file.md` - the file's contents, as `<file>#path/to/file.md ... </file>`
//! - `@https://example.com` - the fetched page body, as `<web_page>#url ... </web_page>`
//! - `@folder_structure` - the base folder's file listing, minus ignored paths,
//!   as `<folder_structure> ... </folder_structure>`
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use atprompt::{ExpandConfig, expand_prompt};
//!
//! let config = ExpandConfig::new("/path/to/project");
//!
//! match expand_prompt("Review @src/app.py against @folder_structure", &config) {
//!     Ok(result) => println!("{}", result),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ### As a Service
//!
//! ```bash
//! # Serve the API on 127.0.0.1:8000, with a front-end from ./static
//! atprompt --static-dir static
//!
//! # Expand from the command line
//! echo "Explain @main.py" | atprompt expand --base-dir /path/to/project
//! ```

pub mod error;
pub mod expand;
pub mod fetch;
pub mod fs_utils;
pub mod ignore_rules;
pub mod server;

// Re-export main types and functions for convenience
pub use error::{AtpromptError, Result};
pub use expand::{ExpandConfig, Target, expand_prompt, find_references, resolve_target};
pub use fetch::Fetcher;
pub use fs_utils::{folder_structure, list_files};
pub use ignore_rules::{IgnoreRules, should_ignore};
pub use server::{AppState, create_router};
