use atprompt::expand::{ExpandConfig, Target, expand_prompt, find_references};
use atprompt::fs_utils::{folder_structure, list_files};
use atprompt::server::{self, DEFAULT_HOST, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT, ServerConfig};
use atprompt::Result;
use clap::{Args, Parser, Subcommand};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
References:
  @path/to/file.md     - Inline the file, wrapped in <file>#path ... </file>
  @https://example.com - Inline the page body, wrapped in <web_page>#url ... </web_page>
  @folder_structure    - Inline the folder listing (built-in ignores + .gitignore)

Examples:
  # Serve the API and the front-end on 127.0.0.1:8000
  atprompt --static-dir static
  # Serve on another port
  ATPROMPT_PORT=9000 atprompt
  # Expand text from the command line
  atprompt expand "Explain @src/app.py" --base-dir /path/to/project
  # Expand from stdin into a file
  cat prompt.txt | atprompt expand -b /path/to/project -o expanded.txt
  # Show the references a prompt contains
  atprompt expand --list "Compare @a.md with @https://example.com"
  # List the files the front-end offers
  atprompt list /path/to/project
  # Show what @folder_structure would contain, as JSON
  atprompt list /path/to/project --structure --json

Endpoints:
  POST /load-folder    {"path": "..."}                          -> {"files": [...]}
  POST /format-prompt  {"input_text": "...", "folder_path": "..."} -> {"formatted_text": "..."}
  GET  /health
"#;

/// Prompt assembly for LLMs: expand @file, @url and @folder_structure references.
#[derive(Parser, Debug)]
#[command(
    name = "atprompt",
    version,
    about = "Prompt assembly for LLMs: expand @file, @url and @folder_structure references.",
    long_about = "Prompt assembly for LLMs: expand @file, @url and @folder_structure references.\n\nWithout a subcommand, serves the HTTP API.",
    after_long_help = LONG_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand the references in a piece of text
    Expand(ExpandArgs),
    /// List the files under a folder
    List(ListArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind
    #[arg(long, value_name = "HOST", env = "ATPROMPT_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind
    #[arg(short, long, value_name = "PORT", env = "ATPROMPT_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Timeout for each @url fetch, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    fetch_timeout: u64,

    /// Directory holding the front-end (index.html is served at /)
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,

    /// Allowed CORS origin (defaults to the server's own address)
    #[arg(long, value_name = "ORIGIN")]
    cors_origin: Option<String>,

    /// Largest accepted request body, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,
}

#[derive(Args, Debug)]
struct ExpandArgs {
    /// Text to expand. Use '-' or omit to read stdin.
    #[arg(value_name = "TEXT")]
    text: Option<String>,

    /// Base directory for resolving @ references (defaults to CWD)
    #[arg(short, long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Timeout for each @url fetch, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    fetch_timeout: u64,

    /// List the references instead of expanding them
    #[arg(long)]
    list: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Folder to list
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// List every file not excluded by ignore rules, as @folder_structure does
    #[arg(long)]
    structure: bool,

    /// Print a JSON array instead of one path per line
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let result = match &cli.command {
        Some(Command::Expand(args)) => run_expand(args),
        Some(Command::List(args)) => run_list(args),
        None => run_server(&cli.serve),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise the level follows `-q`/`-v`
fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,atprompt={level},tower_http={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_server(args: &ServeArgs) -> Result<()> {
    let config = ServerConfig {
        bind_address: bind_address(&args.host, args.port),
        fetch_timeout: Duration::from_secs(args.fetch_timeout),
        static_dir: args.static_dir.clone(),
        cors_origin: args.cors_origin.clone(),
        max_body_bytes: args.max_body_bytes,
    };

    // The runtime is built by hand so the blocking fetch client never lives on it
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(config))
}

fn bind_address(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn read_input(text: Option<&str>) -> Result<String> {
    match text {
        Some(text) if text != "-" => Ok(text.to_string()),
        _ => {
            tracing::info!("Reading prompt from stdin...");
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn run_expand(args: &ExpandArgs) -> Result<()> {
    let input = read_input(args.text.as_deref())?;

    let mut config = ExpandConfig {
        fetch_timeout: Duration::from_secs(args.fetch_timeout),
        ..ExpandConfig::default()
    };
    if let Some(dir) = &args.base_dir {
        config.base_dir = dir.clone();
    }

    if args.list {
        list_references(&input, &config.base_dir);
        return Ok(());
    }

    let expanded = expand_prompt(&input, &config)?;
    write_output(&expanded, args.output.as_deref())
}

fn list_references(input: &str, base_dir: &Path) {
    for reference in find_references(input) {
        match Target::classify(reference) {
            Target::FolderStructure => println!("folder_structure"),
            Target::Url(url) => println!("url   {url}"),
            Target::LocalPath(path) => {
                let found = base_dir.join(path).is_file();
                println!("file  {path}{}", if found { "" } else { " (not found)" });
            }
        }
    }
}

fn run_list(args: &ListArgs) -> Result<()> {
    let files = if args.structure {
        folder_structure(&args.dir)?
    } else {
        list_files(&args.dir)?
    };

    let rendered = if args.json {
        let mut json = serde_json::to_string_pretty(&files)?;
        json.push('\n');
        json
    } else {
        files.iter().map(|f| format!("{f}\n")).collect()
    };
    write_output(&rendered, None)
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    if let Some(output_path) = output {
        tracing::info!("Writing output to {}", output_path.display());
        std::fs::write(output_path, content)?;
    } else {
        print!("{content}");
        io::stdout().flush()?;
    }
    Ok(())
}
