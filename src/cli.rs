use clap::Parser;

use crate::config::{FetchOptions, Limits, MAX_FILE_CONTENT_SIZE, MAX_TOTAL_SIZE};

/// What the binary prints for the selected entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Json,
    Print,
    List { verbose: bool },
}

#[derive(Parser, Debug)]
#[command(name = "tarlens")]
#[command(version)]
#[command(about = "Inspect .tgz and .zip archives from disk or HTTP without unpacking them", long_about = None)]
#[command(after_help = "Examples:\n  \
  tarlens -l pkg.tgz                          list entries of a local archive\n  \
  tarlens -p pkg.tgz package/package.json     print one file\n  \
  tarlens --lazy -p https://example.com/a.tgz package/README.md\n                                              \
  index the remote archive, then read one file")]
pub struct Cli {
    /// Archive path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Entries to show (default: all)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// List entries (short format); overrides -p
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with size, kind and offset
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print text content of the selected entries
    #[arg(short = 'p')]
    pub print: bool,

    /// Index a remote archive and read entries on demand
    #[arg(long)]
    pub lazy: bool,

    /// Emit the parse or index result as JSON
    #[arg(long)]
    pub json: bool,

    /// Extra request header, NAME:VALUE
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Bearer token for private registries
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Entries larger than this are treated as binary
    #[arg(long, value_name = "BYTES", default_value_t = MAX_FILE_CONTENT_SIZE)]
    pub max_file_size: u64,

    /// Archives larger than this are rejected
    #[arg(long, value_name = "BYTES", default_value_t = MAX_TOTAL_SIZE)]
    pub max_total_size: u64,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_file_content_size: self.max_file_size,
            max_total_size: self.max_total_size,
        }
    }

    /// Request options from `-H` and `--token`; malformed headers are
    /// reported by name.
    pub fn fetch_options(&self) -> Result<FetchOptions, String> {
        let mut options = FetchOptions::default();
        for raw in &self.headers {
            let (name, value) = raw
                .split_once(':')
                .ok_or_else(|| format!("invalid header {raw:?}, expected NAME:VALUE"))?;
            options = options.with_header(name.trim(), value.trim());
        }
        if let Some(ref token) = self.token {
            options = options.with_bearer_token(token.clone());
        }
        Ok(options)
    }

    /// Output mode: `--json` wins, then `-p` unless `-l` asks for a listing.
    /// Listing is the default.
    pub fn output(&self) -> Output {
        if self.json {
            Output::Json
        } else if self.print && !self.list {
            Output::Print
        } else {
            Output::List {
                verbose: self.verbose,
            }
        }
    }

    /// Whether `path` was selected on the command line
    pub fn selects(&self, path: &str) -> bool {
        self.paths.is_empty() || self.paths.iter().any(|p| p == path)
    }
}
